pub mod url_mapping;

pub use url_mapping::Entity as UrlMappingEntity;
