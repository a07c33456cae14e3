//! The idiom catalog and the per-install media overrides laid over it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};
use crate::models::{Category, IdiomRecord};
use crate::store::{self, Bin, KeyValueStore};

const EMBEDDED_CATALOG: &str = include_str!("../data/idioms.json");

/// Where idiom records come from.
pub trait CatalogSource {
    fn load(&self) -> Result<Vec<IdiomRecord>>;
}

pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalog {
    fn load(&self) -> Result<Vec<IdiomRecord>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| QuizError::CatalogLoad {
            path: self.path.clone(),
            source,
        })?;
        parse_catalog(&raw)
    }
}

/// The sample set compiled into the binary.
pub struct EmbeddedCatalog;

impl CatalogSource for EmbeddedCatalog {
    fn load(&self) -> Result<Vec<IdiomRecord>> {
        parse_catalog(EMBEDDED_CATALOG)
    }
}

pub fn parse_catalog(raw: &str) -> Result<Vec<IdiomRecord>> {
    let records: Vec<IdiomRecord> = serde_json::from_str(raw).map_err(QuizError::CatalogParse)?;
    tracing::debug!(records = records.len(), "loaded idiom catalog");
    Ok(records)
}

/// idiom id -> override object. Only a string `youtube_id` is applied;
/// other shapes are kept as imported and ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaOverrides(BTreeMap<String, serde_json::Value>);

impl MediaOverrides {
    pub fn link_for(&self, idiom_id: &str) -> Option<&str> {
        self.0
            .get(idiom_id)
            .and_then(|o| o.get("youtube_id"))
            .and_then(|v| v.as_str())
    }

    pub fn set(&mut self, idiom_id: &str, link: &str) {
        self.0.insert(
            idiom_id.to_string(),
            serde_json::json!({ "youtube_id": link.trim() }),
        );
    }

    pub fn clear(&mut self, idiom_id: &str) -> bool {
        self.0.remove(idiom_id).is_some()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn apply_overrides(items: Vec<IdiomRecord>, overrides: &MediaOverrides) -> Vec<IdiomRecord> {
    items
        .into_iter()
        .map(|mut it| {
            if let Some(link) = overrides.link_for(&it.id) {
                it.media_link = Some(link.to_string());
            }
            it
        })
        .collect()
}

/// Loads the catalog with the stored overrides applied.
pub fn load_with_overrides<C, S>(source: &C, store: &S) -> Result<Vec<IdiomRecord>>
where
    C: CatalogSource + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let items = source.load()?;
    let overrides = store::load_overrides(store)?;
    Ok(apply_overrides(items, &overrides))
}

/// Records matching a text query (idiom, meaning or story) and category.
pub fn search<'a>(
    items: &'a [IdiomRecord],
    query: Option<&str>,
    category: Option<Category>,
) -> Vec<&'a IdiomRecord> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    items
        .iter()
        .filter(|it| {
            query.map_or(true, |q| {
                it.idiom.contains(q) || it.meaning.contains(q) || it.story.contains(q)
            })
        })
        .filter(|it| category.map_or(true, |c| it.category == c))
        .collect()
}

pub fn set_override<S: KeyValueStore + ?Sized>(store: &S, idiom_id: &str, link: &str) -> Result<()> {
    let mut overrides = store::load_overrides(store)?;
    overrides.set(idiom_id, link);
    store::save_overrides(store, &overrides)
}

pub fn clear_override<S: KeyValueStore + ?Sized>(store: &S, idiom_id: &str) -> Result<bool> {
    let mut overrides = store::load_overrides(store)?;
    let removed = overrides.clear(idiom_id);
    if removed {
        store::save_overrides(store, &overrides)?;
    }
    Ok(removed)
}

/// Pretty JSON of the stored overrides, suitable for [`import_overrides`].
pub fn export_overrides<S: KeyValueStore + ?Sized>(store: &S) -> Result<String> {
    let raw = store.get(Bin::MediaOverrides)?;
    let value: serde_json::Value = raw
        .and_then(|r| serde_json::from_str(&r).ok())
        .unwrap_or_else(|| serde_json::json!({}));
    serde_json::to_string_pretty(&value).map_err(|source| QuizError::Encode {
        bin: Bin::MediaOverrides.key(),
        source,
    })
}

/// Replaces the overrides with `text`. Only JSON syntax is checked.
pub fn import_overrides<S: KeyValueStore + ?Sized>(store: &S, text: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(QuizError::InvalidImport)?;
    store::save(store, Bin::MediaOverrides, &value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;

    fn record(id: &str, idiom: &str, category: Category) -> IdiomRecord {
        IdiomRecord {
            id: id.to_string(),
            idiom: idiom.to_string(),
            meaning: format!("{idiom} meaning"),
            story: format!("{idiom} story"),
            zhuyin: String::new(),
            category,
            media_link: None,
        }
    }

    mod source_tests {
        use super::*;

        #[test]
        fn embedded_catalog_parses_with_unique_ids() {
            let items = EmbeddedCatalog.load().unwrap();
            assert!(items.len() >= 20);
            let mut ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), items.len());
        }

        #[test]
        fn embedded_catalog_covers_every_category() {
            let items = EmbeddedCatalog.load().unwrap();
            for c in Category::ALL {
                assert!(items.iter().any(|i| i.category == c), "missing {:?}", c);
            }
        }

        #[test]
        fn file_catalog_reads_json() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(
                file,
                r#"[{{"id":"x","idiom":"畫蛇添足","meaning":"m","story":"s","zhuyin":"z","category":"故事典故"}}]"#
            )
            .unwrap();

            let items = FileCatalog::new(file.path()).load().unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].idiom, "畫蛇添足");
        }

        #[test]
        fn missing_file_is_a_load_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = FileCatalog::new(dir.path().join("nope.json"))
                .load()
                .unwrap_err();
            assert!(matches!(err, QuizError::CatalogLoad { .. }));
        }

        #[test]
        fn malformed_catalog_is_a_parse_error() {
            let err = parse_catalog("{\"id\":1}").unwrap_err();
            assert!(matches!(err, QuizError::CatalogParse(_)));
        }
    }

    mod override_tests {
        use super::*;

        #[test]
        fn string_youtube_id_replaces_media_link() {
            let mut ov = MediaOverrides::default();
            ov.set("a", " vid123 ");
            let items = apply_overrides(vec![record("a", "一心一意", Category::Character)], &ov);
            assert_eq!(items[0].media_link.as_deref(), Some("vid123"));
        }

        #[test]
        fn non_string_override_is_ignored() {
            let ov: MediaOverrides =
                serde_json::from_str(r#"{"a":{"youtube_id":5},"b":"junk"}"#).unwrap();
            let mut original = record("a", "一心一意", Category::Character);
            original.media_link = Some("keep".to_string());
            let items = apply_overrides(
                vec![original, record("b", "三心二意", Category::Character)],
                &ov,
            );
            assert_eq!(items[0].media_link.as_deref(), Some("keep"));
            assert!(items[1].media_link.is_none());
        }

        #[test]
        fn set_and_clear_persist() {
            let store = MemoryStore::new();
            set_override(&store, "a", "vid").unwrap();
            assert_eq!(store::load_overrides(&store).unwrap().link_for("a"), Some("vid"));

            assert!(clear_override(&store, "a").unwrap());
            assert!(!clear_override(&store, "a").unwrap());
            assert!(store::load_overrides(&store).unwrap().is_empty());
        }

        #[test]
        fn load_with_overrides_applies_stored_links() {
            let store = MemoryStore::new();
            let items = EmbeddedCatalog.load().unwrap();
            let id = items[0].id.clone();
            set_override(&store, &id, "fresh").unwrap();

            let merged = load_with_overrides(&EmbeddedCatalog, &store).unwrap();
            assert_eq!(merged[0].media_link.as_deref(), Some("fresh"));
        }

        #[test]
        fn export_then_import_restores_overrides() {
            let store = MemoryStore::new();
            set_override(&store, "a", "one").unwrap();
            let text = export_overrides(&store).unwrap();

            let other = MemoryStore::new();
            import_overrides(&other, &text).unwrap();
            assert_eq!(store::load_overrides(&other).unwrap().link_for("a"), Some("one"));
        }

        #[test]
        fn export_of_empty_store_is_empty_object() {
            let store = MemoryStore::new();
            assert_eq!(export_overrides(&store).unwrap(), "{}");
        }

        #[test]
        fn malformed_import_leaves_store_untouched() {
            let store = MemoryStore::new();
            set_override(&store, "a", "one").unwrap();

            let err = import_overrides(&store, "{oops").unwrap_err();
            assert!(matches!(err, QuizError::InvalidImport(_)));
            assert_eq!(store::load_overrides(&store).unwrap().link_for("a"), Some("one"));
        }

        #[test]
        fn schema_is_not_checked_on_import() {
            let store = MemoryStore::new();
            import_overrides(&store, "[1, 2, 3]").unwrap();
            assert_eq!(store.get(Bin::MediaOverrides).unwrap().as_deref(), Some("[1,2,3]"));
            assert!(store::load_overrides(&store).unwrap().is_empty());
        }
    }

    mod search_tests {
        use super::*;

        #[test]
        fn filters_by_text_and_category() {
            let items = vec![
                record("a", "一心一意", Category::Character),
                record("b", "畫蛇添足", Category::Allusion),
                record("c", "一鳴驚人", Category::Allusion),
            ];
            assert_eq!(search(&items, Some("一"), None).len(), 2);
            assert_eq!(search(&items, Some("一"), Some(Category::Allusion)).len(), 1);
            assert_eq!(search(&items, None, None).len(), 3);
            assert_eq!(search(&items, Some("  "), None).len(), 3);
            assert_eq!(search(&items, Some("story"), None).len(), 3);
        }
    }
}
