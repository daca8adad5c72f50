use serde::{Deserialize, Serialize};
use std::fmt;

pub const MANUSCRIPT_DIR: &str = "manuscript";
pub const RENDER_DIR: &str = "render";
pub const README_FILE: &str = "README.md";
pub const LICENSE_FILE: &str = "license.md";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub dir: String,
}

/// Paths of a book's on-disk layout, relative to the repository root.
impl Book {
    pub fn book_path(&self) -> String {
        self.dir.clone()
    }

    pub fn manuscript_path(&self) -> String {
        format!("{}/{}", self.dir, MANUSCRIPT_DIR)
    }

    pub fn render_path(&self) -> String {
        format!("{}/{}", self.dir, RENDER_DIR)
    }

    pub fn render_filename(&self) -> String {
        format!("{}.html", self.dir)
    }

    pub fn render_file_path(&self) -> String {
        format!("{}/{}", self.render_path(), self.render_filename())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// Backed by a file authored directly in the manuscript tree.
    Local,
    /// Imported from a [`Reference`].
    Reference,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: u64,
    pub book_id: u64,
    pub position: i64,
    pub full_filename: String,
    pub menu_label: String,
    pub kind: FragmentKind,
    #[serde(default)]
    pub child: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<u64>,
}

/// A fragment not yet persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFragment {
    pub book_id: u64,
    pub position: i64,
    pub full_filename: String,
    pub menu_label: String,
    pub kind: FragmentKind,
    pub child: bool,
    pub reference_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: u64,
    pub book_id: u64,
    pub created_at_epoch_secs: u64,
    pub html_url: String,
}

/// One converted fragment, ready for assembly into the book page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderItem {
    pub id: u64,
    pub child: bool,
    pub menu_label: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderInfo {
    pub filepath: String,
    pub created: String,
    pub created_epoch_secs: u64,
}
