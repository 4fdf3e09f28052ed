pub mod merger_model;
