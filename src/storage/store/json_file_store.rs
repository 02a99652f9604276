//! A read-only JSON file store.
//!
//! A JSON file store holds named variables in a single JSON document:
//! ```json
//! {
//!   "variables": {
//!     "tas": { "data_type": "float32", "shape": [2, 2], "data": [280.5, 281.0, null, 279.25] }
//!   }
//! }
//! ```
//! `data` is in C order and `null` marks a missing value.
//! Integers beyond `2^53` in magnitude have no exact [`f64`] representation and are rejected when the store is opened.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::{
    array::{ArrayShape, Block, DataType},
    array_subset::ArraySubset,
    storage::{ReadableStorageTraits, StorageError},
};

use super::MemoryStore;

/// A variable of a [`JsonFileStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonVariable {
    /// The data type.
    pub data_type: DataType,
    /// The shape.
    pub shape: ArrayShape,
    /// The elements in C order, [`None`] marking a missing value.
    pub data: Vec<Option<Number>>,
}

/// Every integer up to this magnitude is exactly representable as an [`f64`].
const MAX_EXACT_INTEGER: u64 = 1 << f64::MANTISSA_DIGITS;

impl JsonVariable {
    /// Create a JSON variable from a block.
    ///
    /// Integral elements of an integer `data_type` are written as JSON integers.
    /// Non-finite elements are written as missing.
    #[must_use]
    pub fn new(data_type: DataType, block: &Block) -> Self {
        let data = block
            .to_optional_vec()
            .into_iter()
            .map(|element| element.and_then(|value| to_number(data_type, value)))
            .collect();
        Self {
            data_type,
            shape: block.shape(),
            data,
        }
    }

    fn elements(&self, address: &str) -> Result<Vec<Option<f64>>, StorageError> {
        self.data
            .iter()
            .enumerate()
            .map(|(position, element)| {
                element
                    .as_ref()
                    .map(|number| {
                        exact_f64(number).ok_or_else(|| StorageError::UnrepresentableValue {
                            address: address.to_string(),
                            position,
                            value: number.to_string(),
                        })
                    })
                    .transpose()
            })
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_number(data_type: DataType, value: f64) -> Option<Number> {
    if data_type.is_integer() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER as f64 {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}

fn exact_f64(number: &Number) -> Option<f64> {
    if let Some(value) = number.as_u64() {
        (value <= MAX_EXACT_INTEGER).then_some(value as f64)
    } else if let Some(value) = number.as_i64() {
        (value.unsigned_abs() <= MAX_EXACT_INTEGER).then_some(value as f64)
    } else {
        number.as_f64()
    }
}

#[derive(Serialize, Deserialize)]
struct JsonDocument {
    variables: BTreeMap<String, JsonVariable>,
}

/// A read-only JSON file store.
///
/// The file is read and parsed when the store is opened.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    store: MemoryStore,
}

impl JsonFileStore {
    /// Open a JSON file store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if
    ///  - the file cannot be read or is not a valid JSON store,
    ///  - a variable has the wrong number of elements for its shape, or
    ///  - an element has no exact [`f64`] representation.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let document: JsonDocument = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let store = MemoryStore::new();
        for (address, variable) in document.variables {
            let elements = variable.elements(&address)?;
            let block = Block::from_optional_elements(variable.shape, elements)
                .map_err(|err| StorageError::InvalidVariable(address.clone(), err))?;
            store.set(address, variable.data_type, block);
        }
        Ok(Self { path, store })
    }

    /// Write `variables` to a new JSON file at `path` and open it.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file cannot be written or opened.
    pub fn create<P: AsRef<Path>>(
        path: P,
        variables: BTreeMap<String, JsonVariable>,
    ) -> Result<Self, StorageError> {
        let document = JsonDocument { variables };
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(&document)?)?;
        Self::open(path)
    }

    /// The path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadableStorageTraits for JsonFileStore {
    fn read(&self, address: &str, array_subset: &ArraySubset) -> Result<Block, StorageError> {
        self.store.read(address, array_subset)
    }

    fn shape(&self, address: &str) -> Result<ArrayShape, StorageError> {
        self.store.shape(address)
    }

    fn data_type(&self, address: &str) -> Result<DataType, StorageError> {
        self.store.data_type(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragment.json");
        let block =
            Block::from_optional_elements(vec![2, 2], vec![Some(1.0), None, Some(3.0), Some(4.0)])
                .unwrap();
        let store = JsonFileStore::create(
            &path,
            BTreeMap::from([("tas".to_string(), JsonVariable::new(DataType::Float32, &block))]),
        )
        .unwrap();
        assert_eq!(store.path(), path);
        assert_eq!(store.data_type("tas").unwrap(), DataType::Float32);
        assert_eq!(store.read_all("tas").unwrap(), block);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened
                .read("tas", &ArraySubset::new_with_ranges(&[0..1, 0..2]))
                .unwrap()
                .to_optional_vec(),
            vec![Some(1.0), None]
        );
    }

    #[test]
    fn json_file_store_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        std::fs::write(
            &path,
            r#"{"variables": {"x": {"data_type": "int32", "shape": [3], "data": [1, 2]}}}"#,
        )
        .unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StorageError::InvalidVariable(..))
        ));
        assert!(matches!(
            JsonFileStore::open(dir.path().join("missing.json")),
            Err(StorageError::IOError(_))
        ));
    }

    #[test]
    fn json_file_store_large_integers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int64.json");

        // 2^53 is exact, 2^53 + 1 is not
        std::fs::write(
            &path,
            r#"{"variables": {"id": {"data_type": "int64", "shape": [2], "data": [-9007199254740992, 9007199254740992]}}}"#,
        )
        .unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            store.read_all("id").unwrap().to_optional_vec(),
            vec![Some(-9_007_199_254_740_992.0), Some(9_007_199_254_740_992.0)]
        );

        std::fs::write(
            &path,
            r#"{"variables": {"id": {"data_type": "int64", "shape": [2], "data": [1, 9007199254740993]}}}"#,
        )
        .unwrap();
        let Err(StorageError::UnrepresentableValue {
            address,
            position,
            value,
        }) = JsonFileStore::open(&path)
        else {
            panic!("expected an unrepresentable value error");
        };
        assert_eq!(address, "id");
        assert_eq!(position, 1);
        assert_eq!(value, "9007199254740993");
    }

    #[test]
    fn json_variable_integers() {
        let block =
            Block::from_optional_elements(vec![3], vec![Some(3.0), None, Some(-2.0)]).unwrap();
        let variable = JsonVariable::new(DataType::Int32, &block);
        assert_eq!(
            serde_json::to_string(&variable.data).unwrap(),
            "[3,null,-2]"
        );
        let variable = JsonVariable::new(DataType::Float64, &block);
        assert_eq!(
            serde_json::to_string(&variable.data).unwrap(),
            "[3.0,null,-2.0]"
        );
    }
}
