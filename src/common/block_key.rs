//! Block identifier type.

use std::fmt;

/// Identifies one block of one owner (a table, a matrix or a sort run).
///
/// The key doubles as the name of the block's backing file:
/// `<owner>_Page<index>` under the temp directory.
///
/// # Example
/// ```
/// use tilestore::BlockKey;
///
/// let key = BlockKey::new("A", 4);
/// assert_eq!(key.file_name(), "A_Page4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub owner: String,
    pub index: usize,
}

impl BlockKey {
    #[inline]
    pub fn new(owner: impl Into<String>, index: usize) -> Self {
        Self {
            owner: owner.into(),
            index,
        }
    }

    /// File name of the block, relative to the temp directory.
    pub fn file_name(&self) -> String {
        format!("{}_Page{}", self.owner, self.index)
    }

    /// Same block index under another owner.
    pub fn with_owner(&self, owner: &str) -> Self {
        Self::new(owner, self.index)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
