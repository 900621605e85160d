pub mod elexon;
pub mod prod_db;
