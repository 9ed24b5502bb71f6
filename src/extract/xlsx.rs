//! Spreadsheets via `calamine`: one `## Sheet` section with a GFM table per sheet.

use super::gfm_table;
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

const CATEGORY: ConverterCategory = ConverterCategory::Xlsx;

pub fn extract(path: &Path, _filename: &str) -> Result<String, ExtractError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExtractError::failed(CATEGORY, format!("failed to open workbook: {e}")))?;

    let sheet_names = workbook.sheet_names().to_vec();
    debug!(sheets = sheet_names.len(), "Extracting workbook");

    let mut sections = Vec::with_capacity(sheet_names.len());
    for sheet in sheet_names {
        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            ExtractError::failed(CATEGORY, format!("failed to read sheet '{sheet}': {e}"))
        })?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        if rows.is_empty() {
            sections.push(format!("## {sheet}"));
        } else {
            sections.push(format!("## {sheet}\n\n{}", gfm_table(&rows)));
        }
    }
    Ok(sections.join("\n\n"))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    // One sheet ("Sheet1"): A1="Header", A2="Value", B2=42.
    const MINIMAL_XLSX_BASE64: &str = "UEsDBBQAAAAIAJyhWlzD9b3EJQEAAC8DAAATAAAAW0NvbnRlbnRfVHlwZXNdLnhtbK1SS08CMRC+8yuaXsm24MEYswsHH0flgD+gtrNsQ1/pFIR/7+ziIzGgGD1Nmu/ZTuv5zju2hYw2hoZPxYQzCDoaG1YNf1reV1ecYVHBKBcDNHwPyOezUb3cJ0BG4oAN70pJ11Ki7sArFDFBIKSN2atCx7ySSem1WoG8mEwupY6hQChV6T34bMRYfQut2rjC7naEHLpkcMjZzYHbxzVcpeSsVoVwuQ3mS1D1FiJIOXCwswnHRODyVEgPns74lD7SE2VrgC1ULg/KE1HunHyJef0c41p873Oka2xbq8FEvfEkEZgyKIMdQPFODFN4ZcP4rAoDH+Uwpv/c5cP/hyokX+SYkLab4fcd3nfXq6tERpCLBTw3lNz/fG/ov4UBcyS+lsN/n70CUEsDBBQAAAAIAJyhWlxPY8Kx7AAAAFUCAAALAAAAX3JlbHMvLnJlbHOtks1OwzAMgO97isj3Nd0mIYSa7jIh7Tah8QAmcX/UNo4SA93bEyGBGGKwA8c49ufPlqvtPI3qhWLq2RtYFSUo8pZd71sDj8f75S2oJOgdjuzJwIkSbOtF9UAjSq5JXR+SyhCfDHQi4U7rZDuaMBUcyOefhuOEkp+x1QHtgC3pdVne6PiVAfVCqTOs2jsDce9WoI6nQNfguWl6Szu2zxN5+aHLt4xMxtiSGJhH/cpxeGIeigwFfVFnfb3O5Wn1RIIOBbXlSMsQc3WUPi/308ixPeRwes/4w2nznyuiWcg7cr9bYQgfUpU+u4b6DVBLAwQUAAAACACcoVpc1cMGTcEAAAAoAQAADwAAAHhsL3dvcmtib29rLnhtbI1Py47CMAy88xWR75CWwwpVbbkgJM67+wGhcWnUxq7ssI+/JwX1zskzGs14pj7+xcn8oGhgaqDcFWCQOvaBbg18f523BzCaHHk3MWED/6hwbDf1L8t4ZR5N9pM2MKQ0V9ZqN2B0uuMZKSs9S3QpU7lZnQWd1wExxcnui+LDRhcIXgmVvJPBfR86PHF3j0jpFSI4uZTb6xBmhXZjTP18ogtciSEXc/vPBZd50XIvPg8GI1XIQC6+BPt029Ve23Vl+wBQSwMEFAAAAAgAnKFaXPVgA4K3AAAALQEAABoAAAB4bC9fcmVscy93b3JrYm9vay54bWwucmVsc43PzQrCMAwH8PueouTusnkQkXW7iLCrzAcoXfaBW1ua+rG3t3gQBx48hSTkF/5F9ZwncSfPozUS8jQDQUbbdjS9hEtz2uxBcFCmVZM1JGEhhqpMijNNKsQbHkbHIiKGJQwhuAMi64Fmxal1ZOKms35WIba+R6f0VfWE2yzbof82oEyEWLGibiX4us1BNIujf3jbdaOmo9W3mUz48QUf1l95IAoRVb6nIOEzYnyXPI0qYAyJq5TlC1BLAwQUAAAACACcoVpc5Bkyr9IAAABVAQAAGAAAAHhsL3dvcmtzaGVldHMvc2hlZXQxLnhtbHWQT0vEQAzF7/sphtzddIuISDqLIuLdP/ehjdvBmUyZiV399k57WOzBQyDvhffjETp+x2BmzsUn6eCwb8Cw9Gnwcurg7fXp6hZMUSeDC0m4gx8ucLQ7Oqf8WUZmNRUgpYNRdbpDLP3I0ZV9mljq5SPl6LTKfMIyZXbDGooB26a5wei8gN0ZQ6v96NQtquqczibXQmCpX5b7AxjtwEvwwi+aq++LJbXPlcmZUC3h4mBfp6a3nPbCaf/hvLvwxVvMGnhYorO9bgnnLZ3wT2nCy0fsL1BLAwQUAAAACACcoVpcasaL7d8AAACJAQAAEQAAAGRvY1Byb3BzL2NvcmUueG1sbZBNS8RADIbv/ooy9zatgkiZdm+eFAQVvA6Z2B3sfDCJdvffO1u0LrjH5H3ykETvDn6uviizi2FQXdOqigJG68I0qNeX+/pOVSwmWDPHQIM6EqvdeKUx9RgzPeWYKIsjrooocI9pUHuR1AMw7skbbgoRSvgeszdSyjxBMvhhJoLrtr0FT2KsEQMnYZ02o/pRWtyU6TPPq8Ai0EyegjB0TQd/rFD2fHFgTc5I7+SY6CL6G270gd0GLsvSLDcrWvbv4O3x4Xk9tXbh9CokNWqLPWYyEvMoxKLhrKHh3/fGb1BLAwQUAAAACACcoVpcWQwavqkAAAAUAQAAEAAAAGRvY1Byb3BzL2FwcC54bWydzzELwjAQBeDdX1Gy11QHEUlbBHHuoO4hudpAcxeSs7T/3oigzo53Dz7eU+3sx2KCmBxhLTbrShSAhqzDey2ul3O5F0VijVaPhFCLBZJom5XqIgWI7CAVWcBUi4E5HKRMZgCv0zrHmJOeotecz3iX1PfOwInMwwOy3FbVTsLMgBZsGT6geIuHif9FLZlXv3S7LCF7jTqGMDqjOY9suoUHQiV/f0p+9zRPUEsBAhQDFAAAAAgAnKFaXMP1vcQlAQAALwMAABMAAAAAAAAAAAAAAIABAAAAAFtDb250ZW50X1R5cGVzXS54bWxQSwECFAMUAAAACACcoVpcT2PCsewAAABVAgAACwAAAAAAAAAAAAAAgAFWAQAAX3JlbHMvLnJlbHNQSwECFAMUAAAACACcoVpc1cMGTcEAAAAoAQAADwAAAAAAAAAAAAAAgAFrAgAAeGwvd29ya2Jvb2sueG1sUEsBAhQDFAAAAAgAnKFaXPVgA4K3AAAALQEAABoAAAAAAAAAAAAAAIABWQMAAHhsL19yZWxzL3dvcmtib29rLnhtbC5yZWxzUEsBAhQDFAAAAAgAnKFaXOQZMq/SAAAAVQEAABgAAAAAAAAAAAAAAIABSAQAAHhsL3dvcmtzaGVldHMvc2hlZXQxLnhtbFBLAQIUAxQAAAAIAJyhWlxqxovt3wAAAIkBAAARAAAAAAAAAAAAAACAAVAFAABkb2NQcm9wcy9jb3JlLnhtbFBLAQIUAxQAAAAIAJyhWlxZDBq+qQAAABQBAAAQAAAAAAAAAAAAAACAAV4GAABkb2NQcm9wcy9hcHAueG1sUEsFBgAAAAAHAAcAwgEAADUHAAAAAA==";

    #[test]
    fn sheet_rendered_as_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        std::fs::write(&path, STANDARD.decode(MINIMAL_XLSX_BASE64).unwrap()).unwrap();

        let md = extract(&path, "book.xlsx").unwrap();
        assert_eq!(
            md,
            "## Sheet1\n\n| Header |  |\n| --- | --- |\n| Value | 42 |"
        );
    }

    #[test]
    fn malformed_workbook_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        std::fs::write(&path, "not an xlsx").unwrap();
        assert!(matches!(
            extract(&path, "bad.xlsx"),
            Err(ExtractError::Failed { .. })
        ));
    }
}
