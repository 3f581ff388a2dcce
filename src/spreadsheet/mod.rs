use std::path::PathBuf;

use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;

use crate::{
    config::Config,
    error::{Result, ScrapeError},
    page_scrapers::{GameRecord, COLUMNS},
};


#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SpreadsheetFormat {
    /// Excel workbook with a single sheet
    #[default]
    Xlsx,
    /// Delimited text, comma separated unless configured otherwise
    Csv,
}


impl SpreadsheetFormat {
    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}


/// Where and how the scraped records end up.
#[derive(Debug, Clone)]
pub(crate) struct Spreadsheet {
    pub(crate) path: PathBuf,
    pub(crate) format: SpreadsheetFormat,
    pub(crate) delimiter: u8,
}


impl Spreadsheet {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            path: config.output_path(),
            format: config.format,
            // Validated to be ASCII
            delimiter: config.delimiter as u8,
        }
    }

    /// Renders the header and one row per record, in order.
    pub(crate) fn render(&self, records: &[GameRecord]) -> Result<Vec<u8>> {
        match self.format {
            SpreadsheetFormat::Xlsx => to_xlsx_bytes(records),
            SpreadsheetFormat::Csv => to_csv_bytes(records, self.delimiter),
        }
    }

    /// Writes every record in a single write.
    pub(crate) async fn write(&self, records: &[GameRecord]) -> Result<()> {
        let bytes = self.render(records)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}


pub(super) fn to_csv_bytes(records: &[GameRecord], delimiter: u8) -> Result<Vec<u8>> {
    // The header is written by hand so it shows up even without records
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.into_inner().map_err(|e| ScrapeError::Io(e.into_error()))
}


fn to_xlsx_bytes(records: &[GameRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, title) in (0u16..).zip(COLUMNS) {
        worksheet.write_string_with_format(0, col, title, &bold)?;
    }
    // Everything stays text, votes keep their thousands separators
    for (row, record) in (1u32..).zip(records) {
        for (col, value) in (0u16..).zip(record.values()) {
            worksheet.write_string(row, col, value)?;
        }
    }
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}


#[cfg(test)]
mod tests {
    use super::*;

    const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

    fn tile_match() -> GameRecord {
        GameRecord {
            name: "Tile Match".into(),
            url: "https://games.test/game/tile-match".into(),
            developer: "Acme, Inc.".into(),
            rating: "4.5".into(),
            votes: "12,345".into(),
            platform: "Web Browser".into(),
        }
    }

    fn spreadsheet(path: PathBuf, format: SpreadsheetFormat) -> Spreadsheet {
        Spreadsheet { path, format, delimiter: b',' }
    }

    #[test]
    fn rows_follow_the_header() {
        let bytes = to_csv_bytes(&[tile_match(), GameRecord::failed("Block Drop")], b',').unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Game Name,Game URL,Developer,Rating,Votes,Platform\n\
             Tile Match,https://games.test/game/tile-match,\"Acme, Inc.\",4.5,\"12,345\",Web Browser\n\
             Block Drop (Error),N/A,N/A,N/A,N/A,N/A\n"
        );
    }

    #[test]
    fn tab_delimited() {
        let bytes = to_csv_bytes(&[tile_match()], b'\t').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().next().unwrap(), "Game Name\tGame URL\tDeveloper\tRating\tVotes\tPlatform");
        assert!(text.contains("\tAcme, Inc.\t4.5\t12,345\t"));
    }

    #[test]
    fn header_without_records() {
        let bytes = to_csv_bytes(&[], b',').unwrap();
        assert_eq!(bytes, b"Game Name,Game URL,Developer,Rating,Votes,Platform\n");
    }

    #[test]
    fn workbook_is_a_zip_archive() {
        let bytes = to_xlsx_bytes(&[tile_match(), GameRecord::failed("Block Drop")]).unwrap();
        assert!(bytes.starts_with(ZIP_MAGIC));
        assert!(to_xlsx_bytes(&[]).unwrap().starts_with(ZIP_MAGIC));
    }

    #[test]
    fn format_picks_the_renderer() {
        let csv = spreadsheet(PathBuf::from("games.csv"), SpreadsheetFormat::Csv).render(&[tile_match()]).unwrap();
        assert!(csv.starts_with(b"Game Name,"));

        let xlsx = spreadsheet(PathBuf::from("games.xlsx"), SpreadsheetFormat::Xlsx).render(&[tile_match()]).unwrap();
        assert!(xlsx.starts_with(ZIP_MAGIC));
    }

    #[test]
    fn defaults_to_the_original_workbook() {
        let sheet = Spreadsheet::from_config(&Config::default());
        assert_eq!(sheet.format, SpreadsheetFormat::Xlsx);
        assert_eq!(sheet.path, PathBuf::from("crazygames_data.xlsx"));
    }

    #[tokio::test]
    async fn writes_the_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.csv");
        spreadsheet(path.clone(), SpreadsheetFormat::Csv).write(&[tile_match()]).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), COLUMNS);
        let rows: Vec<_> = reader.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "Acme, Inc.");
    }

    #[tokio::test]
    async fn writes_the_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.xlsx");
        spreadsheet(path.clone(), SpreadsheetFormat::Xlsx).write(&[tile_match()]).await.unwrap();
        assert!(tokio::fs::read(&path).await.unwrap().starts_with(ZIP_MAGIC));
    }

    #[tokio::test]
    async fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("games.xlsx");
        let result = spreadsheet(path, SpreadsheetFormat::Xlsx).write(&[]).await;
        assert!(matches!(result, Err(ScrapeError::Io(_))));
    }
}
