// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Ids, image references, Docker-safe naming, and order-preserving maps.

mod id;
mod image_ref;
mod naming;
mod ordered_map;

pub use id::{DeploymentId, EnvironmentId, Id, OrganizationId, UserId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use naming::{PLACEHOLDER_NAME, docker_safe_name, scoped_name};
pub use ordered_map::OrderedMap;
