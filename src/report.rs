//! CSV output.
//!
//! A report is a serde-serializable row type registered with [`define_report!`]. Each report
//! type gets its own file, `<directory>/<file_prefix><short_name>.csv`, created by
//! [`ContextReportExt::add_report`]; rows are appended with
//! [`ContextReportExt::send_report`] and flushed immediately.
use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;
use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpiGridError;
use crate::log::trace;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use define_report;

/// Where report files go and whether existing files may be replaced.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }

    fn path_for(&self, short_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{short_name}.csv", self.file_prefix))
    }
}

struct ReportData {
    file_writers: RefCell<FxHashMap<TypeId, Writer<File>>>,
    options: ReportOptions,
}

// Registers a data container that stores
// * file_writers: Maps report type to file writer
// * options: Where files are written and whether they may be replaced
define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(FxHashMap::default()),
        options: ReportOptions::default(),
    }
);

pub trait ContextReportExt {
    /// Options applied to reports added after this call.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Creates the file for report type `T` and registers its writer.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ReportError` if the file exists and overwriting is off, or if a
    /// writer for `T` was already added, and `EpiGridError::IoError` if the file or its
    /// directory cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), EpiGridError>;

    /// Writes `report` as a new row of its report file.
    ///
    /// # Errors
    ///
    /// Returns `EpiGridError::ReportError` if no writer was added for `T`, and
    /// `EpiGridError::CsvError` / `EpiGridError::IoError` if writing fails.
    fn send_report<T: Report>(&self, report: T) -> Result<(), EpiGridError>;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_mut(ReportPlugin).options
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), EpiGridError> {
        let data_container = self.get_data_mut(ReportPlugin);
        let path = data_container.options.path_for(short_name);
        let mut file_writers = data_container.file_writers.borrow_mut();
        if file_writers.contains_key(&TypeId::of::<T>()) {
            return Err(EpiGridError::ReportError(format!(
                "a writer was already added for report {short_name}"
            )));
        }
        if path.exists() && !data_container.options.overwrite {
            return Err(EpiGridError::ReportError(format!(
                "{} already exists; enable overwrite to replace it",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        trace!("writing report {short_name} to {}", path.display());
        file_writers.insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), EpiGridError> {
        // No data container will exist if no reports have been added
        let missing =
            || EpiGridError::ReportError("no writer found for the report type".to_string());
        let data_container = self.get_data(ReportPlugin).ok_or_else(missing)?;
        let mut file_writers = data_container.file_writers.borrow_mut();
        let writer = file_writers.get_mut(&report.type_id()).ok_or_else(missing)?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }
}
