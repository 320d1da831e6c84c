pub mod country_names;
pub mod document_loader;
