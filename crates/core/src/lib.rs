//! kmodel core: typed values, type descriptors, field-name translation and the
//! error taxonomy shared by the mapper and the response layer.

#![forbid(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod naming;
pub mod value;

pub use descriptor::{ApiIdentity, DocumentIdentity, ElemShape, FieldShape, FieldSpec, ScalarKind, TypeDescriptor};
pub use error::{MapError, MapResult, RegistryError, RegistryResult};
pub use naming::{host_to_wire, wire_to_host};
pub use value::{json_kind, render_path, Path, PathSeg, RawDocument, Scalar, TypedNode, TypedValue};

pub mod prelude {
    pub use super::{
        ApiIdentity, ElemShape, FieldShape, FieldSpec, MapError, RawDocument, Scalar, ScalarKind, TypeDescriptor,
        TypedNode, TypedValue,
    };
}
