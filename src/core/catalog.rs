//! Static goods catalog mapping item names to Buff163 goods ids.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::{MapAccess, Visitor};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub goods_id: String,
}

/// Catalog entries keep the document order of the goods file, so
/// `find` is deterministic: the first matching entry always wins.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read goods file: {}", path.as_ref().display())
        })?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse goods file: {}", path.as_ref().display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: GoodsFile = serde_json::from_str(content)?;
        Ok(Catalog {
            entries: file.items.0,
        })
    }

    /// Returns the first entry whose name contains `query`,
    /// case-insensitively. An empty query matches the first entry;
    /// callers are expected to reject empty input beforehand.
    pub fn find(&self, query: &str) -> Option<&CatalogEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.name.to_lowercase().contains(&query))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
struct GoodsFile {
    items: OrderedEntries,
}

#[derive(Deserialize)]
struct GoodsItem {
    buff163_goods_id: GoodsId,
}

// The goods file stores ids as numbers or strings, depending on how it
// was generated.
#[derive(Deserialize)]
#[serde(untagged)]
enum GoodsId {
    Number(u64),
    Text(String),
}

impl GoodsId {
    fn into_string(self) -> String {
        match self {
            GoodsId::Number(n) => n.to_string(),
            GoodsId::Text(s) => s,
        }
    }
}

// A HashMap would randomize iteration order; deserialize the name->item
// map through a visitor into a Vec instead.
struct OrderedEntries(Vec<CatalogEntry>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of item names to goods data")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, item)) = map.next_entry::<String, GoodsItem>()? {
                    entries.push(CatalogEntry {
                        name,
                        goods_id: item.buff163_goods_id.into_string(),
                    });
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
