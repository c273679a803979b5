use std::sync::Arc;

use crate::application::loader::ExploreLoader;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct AdminState {
    pub explore: ExploreLoader,
    pub db: Option<Arc<PostgresRepositories>>,
}
