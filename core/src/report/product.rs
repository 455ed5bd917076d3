use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prelude::{StageError, StageResult};

/// One entry of `product.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProductItem {
    Image { filename: String, base64: String },
    Info { text: String },
}

/// Ordered manifest of a run's artifacts, serialized once at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "brainlife")]
    pub items: Vec<ProductItem>,
}

impl Product {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, filename: impl Into<String>, base64: impl Into<String>) {
        self.items.push(ProductItem::Image {
            filename: filename.into(),
            base64: base64.into(),
        });
    }

    pub fn add_info(&mut self, text: impl Into<String>) {
        self.items.push(ProductItem::Info { text: text.into() });
    }

    pub fn image_filenames(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ProductItem::Image { filename, .. } => Some(filename.as_str()),
                ProductItem::Info { .. } => None,
            })
            .collect()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path_ref = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| StageError::Encode(format!("serializing product: {}", err)))?;
        fs::write(path_ref, json).map_err(|err| StageError::io(path_ref, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_serialize_with_type_tags() {
        let mut product = Product::new();
        product.add_image("erp_A.png", "aGVsbG8=");
        product.add_info("Channels: 2");

        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(
            value,
            json!({
                "brainlife": [
                    {"type": "image", "filename": "erp_A.png", "base64": "aGVsbG8="},
                    {"type": "info", "text": "Channels: 2"}
                ]
            })
        );
        assert_eq!(product.image_filenames(), vec!["erp_A.png"]);
    }

    #[test]
    fn write_emits_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product.json");
        let mut product = Product::new();
        product.add_info("Processed 0 epochs");
        product.write(&path).unwrap();

        let parsed: Product = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, product);
    }
}
