use crate::storage::UrlMapping;
use migration::entities::url_mapping;

/// 将 Sea-ORM Model 转换为 UrlMapping
pub fn model_to_mapping(model: url_mapping::Model) -> UrlMapping {
    UrlMapping {
        code: model.code,
        long_url: model.long_url,
        created_at: model.created_at,
        updated_at: model.updated_at.max(model.created_at),
    }
}

/// 将 UrlMapping 转换为 ActiveModel（仅用于插入）
pub fn mapping_to_active_model(mapping: &UrlMapping) -> url_mapping::ActiveModel {
    use sea_orm::ActiveValue::Set;

    url_mapping::ActiveModel {
        code: Set(mapping.code.clone()),
        long_url: Set(mapping.long_url.clone()),
        created_at: Set(mapping.created_at),
        updated_at: Set(mapping.updated_at),
    }
}
