pub mod component;
pub mod instance;
pub mod repository;

pub use component::{Component, Parameter, ParameterDomain, RequiredInterface};
pub use instance::ComponentInstance;
pub use repository::ComponentRepository;
