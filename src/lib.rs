//! Turn relation tables (CSV) into GEXF or GraphML for Gephi and friends.
//!
//! ```rust
//! use csv2graph::{convert, ConversionRequest};
//!
//! let request = ConversionRequest {
//!     edges: Some(b"source,target,weight\na,b,3\n".to_vec()),
//!     ..Default::default()
//! };
//! let output = convert(&request).unwrap();
//! assert_eq!(output.file_name, "output.gexf");
//! assert_eq!(output.node_count, 2);
//! ```

pub mod convert;
pub mod error;
pub mod graph;
pub mod resolve;
pub mod serialize;
pub mod table;

pub use convert::{convert, AttributeSelection, ConversionOutput, ConversionRequest, Selections};
pub use error::{ConvertError, ErrorReport, Result, Stage};
pub use graph::{build, AttrValue, BuildSpec, DanglingPolicy, EdgeRecord, Graph, NodeRecord};
pub use resolve::{find_column, remaining_columns, resolve, ColumnChoice, ColumnOptions, Role};
pub use serialize::{serialize, Format};
pub use table::{normalize_name, Delimiter, Table, TableKind};
