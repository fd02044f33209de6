//! Standard templates built on the public template API
//!
//! Every constructor validates its description and returns a fresh
//! [`Template`](crate::template::Template).
//!
//! ```rust,ignore
//! let name = composite_from(
//!     CompositionDescription::new("Album.name")
//!         .compose(false)
//!         .step(library::expose_dependency_or_continue()?.instantiate([("dependency", "nameOverride")])?)
//!         .step(library::expose_dependency()?.instantiate([("dependency", "baseName")])?),
//! )?;
//! ```

mod availability;
mod control_flow;
mod data;

pub use availability::{mode_input, with_result_of_availability_check, AvailabilityMode, AVAILABILITY};
pub use control_flow::{
    exit_without_dependency, expose_constant, expose_dependency, expose_dependency_or_continue,
    expose_update_value_or_continue, raise_output_without_dependency,
};
pub use data::{with_property_from_list, with_property_from_object};
