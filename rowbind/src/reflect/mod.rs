//! Field resolution: naming conventions and the cached column-to-field maps

mod mapper;
mod naming;

pub use mapper::{
    default_mapper, missing_field, set_default_convention, FieldMap, FieldPath, Mapper,
};
pub use naming::NameConvention;
