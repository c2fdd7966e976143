pub mod document_loader;
