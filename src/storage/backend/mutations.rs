//! Write operations for SeaOrmStorage

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, TransactionTrait};
use tracing::{debug, info, trace};

use super::converters::{mapping_to_active_model, model_to_mapping};
use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::UrlMapping;

use migration::entities::url_mapping;

impl SeaOrmStorage {
    /// 插入新映射
    ///
    /// 先删除同 code 的过期行，再 `ON CONFLICT DO NOTHING` 插入：
    /// 并发重复插入退化为空操作，已存在的活跃行不会被覆盖。
    /// 返回是否真正写入了一行。
    pub(super) async fn insert_mapping(&self, mapping: &UrlMapping) -> Result<bool> {
        let db = &self.db;
        let cutoff = Utc::now() - self.retention;
        let op = format!("insert({})", mapping.code);

        let inserted = retry::with_retry_timeout(&op, self.retry_config, || async {
            let txn = db.begin().await?;

            url_mapping::Entity::delete_many()
                .filter(url_mapping::Column::Code.eq(mapping.code.as_str()))
                .filter(url_mapping::Column::UpdatedAt.lt(cutoff))
                .exec(&txn)
                .await?;

            let rows = url_mapping::Entity::insert(mapping_to_active_model(mapping))
                .on_conflict(
                    OnConflict::column(url_mapping::Column::Code)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;

            txn.commit().await?;
            Ok::<_, DbErr>(rows)
        })
        .await
        .map_err(|e| Self::map_failure(&op, e))?;

        if inserted == 0 {
            debug!(
                "Insert for code '{}' was a no-op, a live mapping already holds it",
                mapping.code
            );
            return Ok(false);
        }
        trace!("Mapping inserted: {}", mapping.code);
        Ok(true)
    }

    /// 读取并刷新 updated_at（同一事务内完成）
    pub(super) async fn touch_live(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>> {
        let db = &self.db;
        let cutoff = now - self.retention;
        let op = format!("find_and_touch({})", code);

        let model = retry::with_retry_timeout(&op, self.retry_config, || async {
            let txn = db.begin().await?;

            let updated = url_mapping::Entity::update_many()
                .col_expr(url_mapping::Column::UpdatedAt, Expr::value(now))
                .filter(url_mapping::Column::Code.eq(code))
                .filter(url_mapping::Column::UpdatedAt.gte(cutoff))
                .exec(&txn)
                .await?;

            if updated.rows_affected == 0 {
                txn.rollback().await?;
                return Ok::<_, DbErr>(None);
            }

            let model = url_mapping::Entity::find_by_id(code).one(&txn).await?;
            txn.commit().await?;
            Ok(model)
        })
        .await
        .map_err(|e| Self::map_failure(&op, e))?;

        Ok(model.map(model_to_mapping))
    }

    /// 删除超过保留期未被访问的映射
    pub(super) async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        let cutoff = now - self.retention;

        let deleted = retry::with_retry_timeout("purge_expired", self.retry_config, || async {
            url_mapping::Entity::delete_many()
                .filter(url_mapping::Column::UpdatedAt.lt(cutoff))
                .exec(db)
                .await
                .map(|res| res.rows_affected)
        })
        .await
        .map_err(|e| Self::map_failure("purge_expired", e))?;

        if deleted > 0 {
            info!("Expired {} url mappings (cutoff {})", deleted, cutoff);
        }
        Ok(deleted)
    }
}
