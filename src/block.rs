//! The block model (spec.md §4.D): an ordered, named, typed column sequence
//! with a row count and block-info metadata.

use crate::column::Column;
use crate::errors::{Error, Result};
use crate::io::{ClickhouseRead, ClickhouseWrite};
use crate::protocol::DBMS_MIN_REVISION_WITH_BLOCK_INFO;

/// Small metadata record inside a `Data` packet: overflow flag and
/// aggregation bucket number, framed with tagged fields terminated by a zero
/// tag (spec.md GLOSSARY, §4.F "Data packet decode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub is_overflows: bool,
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        BlockInfo {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

impl BlockInfo {
    pub fn read<R: ClickhouseRead + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut info = Self::default();
        loop {
            match reader.read_var_uint()? {
                0 => break,
                1 => info.is_overflows = reader.read_bool()?,
                2 => info.bucket_num = reader.read_i32_le()?,
                other => {
                    return Err(Error::protocol(format!(
                        "unknown block info field number: {other}"
                    )))
                }
            }
        }
        Ok(info)
    }

    pub fn write<W: ClickhouseWrite + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_var_uint(1)?;
        writer.write_bool(self.is_overflows)?;
        writer.write_var_uint(2)?;
        writer.write_i32_le(self.bucket_num)?;
        writer.write_var_uint(0)?;
        Ok(())
    }
}

/// An ordered sequence of `(name, column)` pairs sharing one declared row
/// count. The distinguished `Block::empty()` (zero columns, zero rows) is the
/// exclusive end-of-stream sentinel on the client→server data channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub info: BlockInfo,
    rows: u64,
    columns: Vec<(String, Column)>,
}

impl Block {
    /// Reserves slots for `num_columns` columns declaring `num_rows` rows.
    pub fn new(num_columns: usize, num_rows: u64) -> Self {
        Block {
            info: BlockInfo::default(),
            rows: num_rows,
            columns: Vec::with_capacity(num_columns),
        }
    }

    /// The end-of-data marker: zero columns, zero rows.
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// True for the end-of-data marker, whether constructed directly or
    /// decoded off the wire.
    pub fn is_empty_marker(&self) -> bool {
        self.columns.is_empty() && self.rows == 0
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Appends a column to the back. Row-count agreement with the block's
    /// declared count is checked at serialize time, not here (spec.md §4.D).
    pub fn append_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::protocol("column name must not be empty"));
        }
        self.columns.push((name, column));
        Ok(())
    }

    /// Yields `(name, type_name, column)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String, &Column)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column.type_name(), column))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Decodes a `Data` packet's block body (spec.md §4.F "Data packet
    /// decode"): `BlockInfo` gated on revision, then `num_columns`,
    /// `num_rows`, then each `{name, type, column_body}` entry.
    pub fn read<R: ClickhouseRead + ?Sized>(reader: &mut R, revision: u64) -> Result<Self> {
        let info = if revision >= DBMS_MIN_REVISION_WITH_BLOCK_INFO {
            BlockInfo::read(reader)?
        } else {
            BlockInfo::default()
        };
        let num_columns = reader.read_var_uint()?;
        let num_rows = reader.read_var_uint()?;
        let mut block = Block {
            info,
            rows: num_rows,
            columns: Vec::with_capacity(num_columns as usize),
        };
        for _ in 0..num_columns {
            let name = reader.read_string()?;
            let type_name = reader.read_string()?;
            let column = Column::load(&type_name, reader, num_rows as usize)?;
            block.append_column(name, column)?;
        }
        Ok(block)
    }

    /// Encodes a `Data` packet's block body, symmetric with [`Block::read`].
    /// The `BlockInfo` block is emitted unconditionally when the server
    /// revision supports it (spec.md §4.F "Data packet encode").
    pub fn write<W: ClickhouseWrite + ?Sized>(&self, writer: &mut W, revision: u64) -> Result<()> {
        if revision >= DBMS_MIN_REVISION_WITH_BLOCK_INFO {
            self.info.write(writer)?;
        }
        writer.write_var_uint(self.columns.len() as u64)?;
        writer.write_var_uint(self.rows)?;
        for (name, column) in &self.columns {
            if column.size() as u64 != self.rows {
                return Err(Error::protocol(format!(
                    "column '{name}' has {} rows, block declares {}",
                    column.size(),
                    self.rows
                )));
            }
            writer.write_string(name)?;
            writer.write_string(&column.type_name())?;
            column.save(writer)?;
        }
        Ok(())
    }
}
