//! Historical quote dataset: arrival-ordered rows plus a last-row index per product.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::domain::history::{normalize_description, HistoricalRecord};
use crate::errors::OptimizationError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not open history dataset `{path}`: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("could not parse history dataset: {0}")]
    Parse(#[from] csv::Error),
    #[error("history dataset row {row} has a non-finite `{column}` value")]
    NonFinite { row: usize, column: &'static str },
}

#[derive(Clone, Debug, Default)]
pub struct HistoryDataset {
    records: Vec<HistoricalRecord>,
    latest_by_product: HashMap<String, usize>,
}

/// Distinct values per categorical column, sorted, as offered by the quoting form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FormOptions {
    #[serde(rename = "FaixaPeso")]
    pub weight_bands: Vec<String>,
    #[serde(rename = "ProdutoFamilia")]
    pub product_families: Vec<String>,
    #[serde(rename = "ProdutoDescricao")]
    pub product_descriptions: Vec<String>,
    #[serde(rename = "ProdutoGrupoSOP")]
    pub product_groups_sop: Vec<String>,
    #[serde(rename = "Canal")]
    pub channels: Vec<String>,
    #[serde(rename = "EmpresaNome")]
    pub company_names: Vec<String>,
    #[serde(rename = "ClienteCNPJCPF")]
    pub customer_documents: Vec<String>,
}

impl HistoryDataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|source| HistoryError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, HistoryError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::Fields).from_reader(reader);
        let mut records = Vec::new();

        for (index, row) in csv_reader.deserialize::<HistoricalRecord>().enumerate() {
            let record = row?;
            // header is line 1
            let row_number = index + 2;
            for (column, value) in [
                ("totalSold", record.total_sold),
                ("TotalQuoted", record.total_quoted),
                ("ConversionRate_%", record.conversion_rate_pct),
            ] {
                if !value.is_finite() {
                    return Err(HistoryError::NonFinite { row: row_number, column });
                }
            }
            records.push(record);
        }

        Ok(Self::from_records(records))
    }

    pub fn from_records(mut records: Vec<HistoricalRecord>) -> Self {
        let mut latest_by_product = HashMap::with_capacity(records.len());

        for (index, record) in records.iter_mut().enumerate() {
            record.product_description = normalize_description(&record.product_description);
            latest_by_product.insert(record.product_description.clone(), index);
        }

        Self { records, latest_by_product }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn product_count(&self) -> usize {
        self.latest_by_product.len()
    }

    /// Most recent row (by arrival order) for a product description.
    pub fn latest_for(&self, product_description: &str) -> Result<&HistoricalRecord, OptimizationError> {
        let key = normalize_description(product_description);
        self.latest_by_product
            .get(&key)
            .and_then(|index| self.records.get(*index))
            .ok_or(OptimizationError::NotFound { product: key })
    }

    pub fn form_options(&self) -> FormOptions {
        fn distinct<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
            values.flatten().cloned().collect::<BTreeSet<_>>().into_iter().collect()
        }

        FormOptions {
            weight_bands: distinct(self.records.iter().map(|r| r.weight_band.as_ref())),
            product_families: distinct(self.records.iter().map(|r| r.product_family.as_ref())),
            product_descriptions: distinct(
                self.records.iter().map(|r| Some(&r.product_description)),
            ),
            product_groups_sop: distinct(self.records.iter().map(|r| r.product_group_sop.as_ref())),
            channels: distinct(self.records.iter().map(|r| r.channel.as_ref())),
            company_names: distinct(self.records.iter().map(|r| r.company_name.as_ref())),
            customer_documents: distinct(
                self.records.iter().map(|r| r.customer_document.as_ref()),
            ),
        }
    }
}
