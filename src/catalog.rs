//! Catalog - the registry of loaded tables and matrices.

use std::collections::HashMap;

use log::debug;

use crate::buffer::BufferManager;
use crate::common::{Error, Result};
use crate::matrix::Matrix;
use crate::table::Table;

/// Loaded relations by name.
///
/// Tables and matrices live in separate namespaces, matching how commands
/// address them. Removing an entry unloads it.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
    matrices: HashMap<String, Matrix>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Register a table under its own name.
    ///
    /// # Errors
    /// `Error::AlreadyExists` if a table of that name is loaded.
    pub fn insert_table(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(table.name()) {
            return Err(Error::AlreadyExists(table.name().to_string()));
        }
        debug!("catalog: adding table {}", table.name());
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Unload a table and forget it.
    pub fn remove_table(&mut self, bm: &BufferManager, name: &str) -> Result<()> {
        let mut table = self
            .tables
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        table.unload(bm);
        Ok(())
    }

    /// Rename a loaded table and its blocks.
    pub fn rename_table(&mut self, bm: &BufferManager, from: &str, to: &str) -> Result<()> {
        if self.tables.contains_key(to) {
            return Err(Error::AlreadyExists(to.to_string()));
        }
        let mut table = self
            .tables
            .remove(from)
            .ok_or_else(|| Error::NotFound(from.to_string()))?;
        table.rename(bm, to);
        self.tables.insert(to.to_string(), table);
        Ok(())
    }

    /// Loaded table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Register a matrix under its own name.
    ///
    /// # Errors
    /// `Error::AlreadyExists` if a matrix of that name is loaded.
    pub fn insert_matrix(&mut self, matrix: Matrix) -> Result<()> {
        if self.matrices.contains_key(matrix.name()) {
            return Err(Error::AlreadyExists(matrix.name().to_string()));
        }
        debug!("catalog: adding matrix {}", matrix.name());
        self.matrices.insert(matrix.name().to_string(), matrix);
        Ok(())
    }

    pub fn matrix(&self, name: &str) -> Result<&Matrix> {
        self.matrices
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn matrix_mut(&mut self, name: &str) -> Result<&mut Matrix> {
        self.matrices
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains_matrix(&self, name: &str) -> bool {
        self.matrices.contains_key(name)
    }

    /// Unload a matrix and forget it.
    pub fn remove_matrix(&mut self, bm: &BufferManager, name: &str) -> Result<()> {
        let mut matrix = self
            .matrices
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        matrix.unload(bm);
        Ok(())
    }

    /// Rename a loaded matrix and its tiles.
    pub fn rename_matrix(&mut self, bm: &BufferManager, from: &str, to: &str) -> Result<()> {
        if self.matrices.contains_key(to) {
            return Err(Error::AlreadyExists(to.to_string()));
        }
        let mut matrix = self
            .matrices
            .remove(from)
            .ok_or_else(|| Error::NotFound(from.to_string()))?;
        matrix.rename(bm, to);
        self.matrices.insert(to.to_string(), matrix);
        Ok(())
    }

    /// Loaded matrix names, sorted.
    pub fn matrix_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.matrices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Unload everything.
    pub fn unload_all(&mut self, bm: &BufferManager) {
        for (_, mut table) in self.tables.drain() {
            table.unload(bm);
        }
        for (_, mut matrix) in self.matrices.drain() {
            matrix.unload(bm);
        }
    }
}
