use std::path::PathBuf;

use uuid::Uuid;

use crate::domain::batch::{BatchExport, EXPORT_COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Export serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Writes `<batch_id>.json` (the output reference) and `<batch_id>.csv` next to it.
pub struct BatchExporter {
    directory: PathBuf,
}

impl BatchExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        BatchExporter {
            directory: directory.into(),
        }
    }

    pub fn json_path(&self, batch_id: Uuid) -> PathBuf {
        self.directory.join(format!("{}.json", batch_id))
    }

    pub fn csv_path(&self, batch_id: Uuid) -> PathBuf {
        self.directory.join(format!("{}.csv", batch_id))
    }

    pub fn output_ref(&self, batch_id: Uuid) -> String {
        self.json_path(batch_id).to_string_lossy().to_string()
    }

    pub async fn write(&self, export: &BatchExport) -> Result<(), ExportError> {
        let batch_id = export.metadata.batch_id;
        tokio::fs::create_dir_all(&self.directory).await?;

        let json = serde_json::to_vec_pretty(export)?;
        tokio::fs::write(self.json_path(batch_id), json).await?;
        tokio::fs::write(self.csv_path(batch_id), to_csv(export)?).await?;

        log::info!(
            "Wrote export for batch {} to {}",
            batch_id,
            self.output_ref(batch_id)
        );
        Ok(())
    }
}

pub fn to_csv(export: &BatchExport) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    writer.write_record(EXPORT_COLUMNS)?;
    for row in export.rows() {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::{to_csv, BatchExporter};
    use crate::domain::{
        batch::{BatchJob, BatchOptions},
        business::{BusinessRecord, ContactRecord},
        search::{ScrapingResult, SearchParams, SourceKind},
    };

    fn finished_job(exporter: &BatchExporter) -> BatchJob {
        let mut job = BatchJob::new(
            vec!["move-out cleaning".to_string()],
            vec!["Miami, Florida".to_string()],
            Some(50),
            BatchOptions::default(),
            |id| exporter.output_ref(id),
        );

        let mut business = BusinessRecord::new(
            "Sparkle Clean".to_string(),
            SourceKind::Scrape,
            "https://www.google.com/search".to_string(),
        );
        business.contacts = vec![
            ContactRecord::new(business.id, "Ana".to_string(), Some("Owner".to_string()), None, None),
            ContactRecord::new(business.id, "Bo".to_string(), Some("Cleaner".to_string()), None, None),
        ];
        job.record_result(ScrapingResult::new(
            Uuid::new_v4(),
            &SearchParams::new("move-out cleaning", "Miami, Florida"),
            vec![business, BusinessRecord::new("Maid Right".to_string(), SourceKind::Scrape, String::new())],
            vec![],
            vec![],
            vec![],
        ));
        job.finish();
        job
    }

    #[test]
    fn csv_has_header_and_one_row_per_contact() {
        let exporter = BatchExporter::new("exports");
        let export = finished_job(&exporter).export();

        let csv = String::from_utf8(to_csv(&export).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("business_name,category,address,phone,email,website,source"));
        assert!(lines[1].starts_with("Sparkle Clean,"));
        assert!(lines[1].ends_with(",Ana,Owner,,,true"));
        assert!(lines[3].starts_with("Maid Right,"));
    }

    #[tokio::test]
    async fn write_creates_json_and_csv() {
        let dir = TempDir::new().unwrap();
        let exporter = BatchExporter::new(dir.path().join("exports"));
        let job = finished_job(&exporter);

        exporter.write(&job.export()).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&job.output_ref).unwrap()).unwrap();
        assert_eq!(json["metadata"]["batchId"], job.batch_id.to_string());
        assert_eq!(json["metadata"]["totalContacts"], 2);
        assert_eq!(json["groups"][0]["service"], "move-out cleaning");
        assert_eq!(json["groups"][0]["rows"].as_array().unwrap().len(), 3);
        assert!(exporter.csv_path(job.batch_id).exists());
    }
}
