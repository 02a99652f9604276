//! A rust library for decompressing the compressed and virtual arrays of the [CF conventions](https://cfconventions.org) data model.
//!
//! CF-netCDF datasets frequently store a large, regularly shaped array in a much smaller irregular encoding.
//! This crate turns such an encoding, together with its auxiliary index and parameter arrays, back into the logical uncompressed array.
//! Decompression is done on demand, in independently computable chunks, so the full array is only materialised when it is requested.
//!
//! ## Supported Encodings
//!  - **Ragged arrays** (CF §9.3): [contiguous](array::ragged::RaggedContiguous), [indexed](array::ragged::RaggedIndexed) and [indexed contiguous](array::ragged::RaggedIndexedContiguous).
//!  - **Gathered arrays** (CF §8.2): [compression by gathering](array::gathered::Gathered).
//!  - **Subsampled coordinates** (CF §8.3 and Appendix J): [tie point interpolation](array::subsampled::Subsampled).
//!  - **UGRID mesh topology**: [cell bounds](array::mesh::BoundsFromNodes), [cell connectivity](array::mesh::CellConnectivity) and [point topology](array::mesh::PointTopology).
//!  - **Aggregation** (CF §2.8): [fragment aggregated arrays](array::aggregated::Aggregated).
//!
//! ## Getting Started
//! - [`array::CompressedArray`] is the uniform entry point. Construct one from a compression kind, then call [`get`](array::CompressedArray::get) or build a [`TaskGraph`](array::TaskGraph) with [`to_chunked_graph`](array::CompressedArray::to_chunked_graph).
//! - Compressed data and auxiliary arrays are read through [`storage::ReadableStorageTraits`]. An in-memory [`MemoryStore`](storage::store::MemoryStore) and a JSON file store, [`JsonFileStore`](storage::store::JsonFileStore), are included.
//! - Chunking requests are described by a [`ChunkSpec`](chunk_geometry::ChunkSpec).
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use cfdm_compressed::array::{ragged::RaggedContiguous, AuxiliaryArray, Block, CompressedArray, CompressedSource};
//! use cfdm_compressed::array_subset::ArraySubset;
//!
//! let data = Block::from_elements(vec![5], vec![1.0, 2.0, 3.0, 4.0, 5.0])?;
//! let count = Block::from_elements(vec![3], vec![3.0, 0.0, 2.0])?;
//! let array = CompressedArray::new(RaggedContiguous::new(
//!     CompressedSource::from(data),
//!     AuxiliaryArray::from(count),
//! )?);
//! assert_eq!(array.known_shape()?, vec![3, 3]);
//!
//! let block = array.get(&ArraySubset::new_with_ranges(&[2..3, 0..3]))?;
//! assert_eq!(block.to_optional_vec(), vec![Some(4.0), Some(5.0), None]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `cfdm_compressed` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod array;
pub mod array_subset;
pub mod chunk_geometry;
pub mod config;
pub mod storage;
