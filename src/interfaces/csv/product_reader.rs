use crate::domain::product::Product;
use crate::error::{Result, ShopError};
use std::io::Read;

/// Reads products from a CSV sheet.
///
/// Expected header: `id,name,description,price,stock,category,featured,image`.
/// `description` and `image` may be left empty.
pub struct ProductReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ProductReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one product per row.
    pub fn products(self) -> impl Iterator<Item = Result<Product>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ShopError::from))
    }
}
