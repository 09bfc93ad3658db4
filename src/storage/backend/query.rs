//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::trace;

use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::UrlMapping;

use migration::entities::url_mapping;

use super::converters::model_to_mapping;

impl SeaOrmStorage {
    /// 只返回未过期的映射；过期但尚未被清理的行视为不存在
    pub(super) async fn find_live(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>> {
        let db = &self.db;
        let cutoff = now - self.retention;
        let op = format!("find_by_code({})", code);

        let model = retry::with_retry_timeout(&op, self.retry_config, || async {
            url_mapping::Entity::find_by_id(code)
                .filter(url_mapping::Column::UpdatedAt.gte(cutoff))
                .one(db)
                .await
        })
        .await
        .map_err(|e| Self::map_failure(&op, e))?;

        trace!("find_by_code({}) -> {}", code, model.is_some());
        Ok(model.map(model_to_mapping))
    }

    pub(super) async fn count_rows(&self) -> Result<u64> {
        let db = &self.db;
        retry::with_retry_timeout("count", self.retry_config, || async {
            url_mapping::Entity::find().count(db).await
        })
        .await
        .map_err(|e| Self::map_failure("count", e))
    }
}
