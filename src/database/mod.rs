pub mod entity;
pub mod manager;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod repository;
pub mod response;
pub mod statement;

pub use entity::{Column, Entity, RecordMeta, SqlType, Table};
pub use manager::{DatabaseError, DatabaseManager};
pub use pagination::{
    ListOptions, Page, Pagination, PaginationConfig, PaginationInfo, PaginationResult, QueryOptions,
};
pub use repository::{Created, Repository};
pub use response::{PostgresResponse, ResponseData, ResponseInfo};
