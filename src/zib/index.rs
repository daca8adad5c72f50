//! Manual edits to a book's fragment index and reference list.

use crate::error::ZibError;
use crate::zib::model::{Book, Fragment, FragmentKind, Reference};
use crate::zib::store::RecordStore;
use anyhow::Result;

#[derive(Debug, Clone, Default)]
pub struct FragmentEdit {
    pub menu_label: Option<String>,
    pub position: Option<i64>,
    pub child: Option<bool>,
    /// `Some(None)` unlinks the reference.
    pub reference_id: Option<Option<u64>>,
}

impl FragmentEdit {
    pub fn is_empty(&self) -> bool {
        self.menu_label.is_none()
            && self.position.is_none()
            && self.child.is_none()
            && self.reference_id.is_none()
    }
}

pub fn require_fragment(store: &dyn RecordStore, book: &Book, full_filename: &str) -> Result<Fragment> {
    store
        .find_fragment_by_filename(book.id, full_filename)?
        .ok_or_else(|| {
            ZibError::NotFound(format!("fragment `{full_filename}` in book {}", book.id)).into()
        })
}

pub fn edit_fragment(
    store: &dyn RecordStore,
    book: &Book,
    full_filename: &str,
    edit: &FragmentEdit,
) -> Result<Fragment> {
    if edit.is_empty() {
        return Err(ZibError::Validation("nothing to change".to_string()).into());
    }
    let mut fragment = require_fragment(store, book, full_filename)?;

    if let Some(label) = &edit.menu_label {
        let label = label.trim();
        if label.is_empty() {
            return Err(ZibError::Validation("menu label cannot be empty".to_string()).into());
        }
        fragment.menu_label = label.to_string();
    }
    if let Some(position) = edit.position {
        if position < 1 {
            return Err(ZibError::Validation(format!(
                "position must be >= 1, got {position}"
            ))
            .into());
        }
        fragment.position = position;
    }
    if let Some(child) = edit.child {
        fragment.child = child;
    }
    match edit.reference_id {
        Some(Some(reference_id)) => {
            let reference = store
                .find_reference(reference_id)?
                .filter(|r| r.book_id == book.id)
                .ok_or_else(|| {
                    ZibError::NotFound(format!("reference {reference_id} in book {}", book.id))
                })?;
            fragment.reference_id = Some(reference.id);
            fragment.kind = FragmentKind::Reference;
        }
        Some(None) => {
            fragment.reference_id = None;
            fragment.kind = FragmentKind::Local;
        }
        None => {}
    }

    // The store rejects a position already taken in the book.
    store.save_fragment(&fragment)?;
    Ok(fragment)
}

pub fn add_reference(
    store: &dyn RecordStore,
    book: &Book,
    html_url: &str,
    created_at_epoch_secs: u64,
) -> Result<Reference> {
    let url = html_url.trim();
    if url.is_empty() || !url.contains("://") {
        return Err(ZibError::Validation(format!("`{url}` is not an absolute URL")).into());
    }
    store.insert_reference(book.id, url, created_at_epoch_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::domain_error;
    use crate::zib::model::NewFragment;
    use crate::zib::store::MemoryStore;

    fn seeded() -> (MemoryStore, Book) {
        let store = MemoryStore::new();
        let book = store.insert_book("My Book", "my_book").expect("book");
        for (position, name) in [(1, "a.md"), (2, "b.md")] {
            store
                .insert_fragment(NewFragment {
                    book_id: book.id,
                    position,
                    full_filename: name.to_string(),
                    menu_label: name.to_string(),
                    kind: FragmentKind::Local,
                    child: false,
                    reference_id: None,
                })
                .expect("fragment");
        }
        (store, book)
    }

    #[test]
    fn edit_updates_label_child_and_position() {
        let (store, book) = seeded();
        let edit = FragmentEdit {
            menu_label: Some("  Opening ".to_string()),
            position: Some(5),
            child: Some(true),
            reference_id: None,
        };
        let got = edit_fragment(&store, &book, "a.md", &edit).expect("edit");
        assert_eq!(got.menu_label, "Opening");
        assert_eq!(got.position, 5);
        assert!(got.child);

        let order = store
            .fragments(book.id)
            .expect("fragments")
            .into_iter()
            .map(|f| f.full_filename)
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["b.md", "a.md"]);
    }

    #[test]
    fn taken_position_is_rejected() {
        let (store, book) = seeded();
        let edit = FragmentEdit {
            position: Some(2),
            ..FragmentEdit::default()
        };
        let err = edit_fragment(&store, &book, "a.md", &edit).expect_err("taken");
        assert!(matches!(domain_error(&err), Some(ZibError::Validation(_))));
    }

    #[test]
    fn linking_reference_switches_kind() {
        let (store, book) = seeded();
        let reference = add_reference(&store, &book, "https://example.com/x", 1).expect("ref");

        let linked = edit_fragment(
            &store,
            &book,
            "b.md",
            &FragmentEdit {
                reference_id: Some(Some(reference.id)),
                ..FragmentEdit::default()
            },
        )
        .expect("link");
        assert_eq!(linked.kind, FragmentKind::Reference);
        assert_eq!(linked.reference_id, Some(reference.id));

        let unlinked = edit_fragment(
            &store,
            &book,
            "b.md",
            &FragmentEdit {
                reference_id: Some(None),
                ..FragmentEdit::default()
            },
        )
        .expect("unlink");
        assert_eq!(unlinked.kind, FragmentKind::Local);
        assert_eq!(unlinked.reference_id, None);
    }

    #[test]
    fn reference_of_another_book_cannot_be_linked() {
        let (store, book) = seeded();
        let other = store.insert_book("Other", "other").expect("other");
        let foreign = add_reference(&store, &other, "https://example.com/y", 1).expect("ref");

        let err = edit_fragment(
            &store,
            &book,
            "a.md",
            &FragmentEdit {
                reference_id: Some(Some(foreign.id)),
                ..FragmentEdit::default()
            },
        )
        .expect_err("foreign");
        assert!(matches!(domain_error(&err), Some(ZibError::NotFound(_))));
    }

    #[test]
    fn empty_edit_and_bad_url_are_validation_errors() {
        let (store, book) = seeded();
        assert!(edit_fragment(&store, &book, "a.md", &FragmentEdit::default()).is_err());
        assert!(add_reference(&store, &book, "not a url", 1).is_err());
        assert!(
            edit_fragment(
                &store,
                &book,
                "zzz.md",
                &FragmentEdit {
                    child: Some(true),
                    ..FragmentEdit::default()
                }
            )
            .is_err()
        );
    }
}
