use sqlx::PgPool;
use uuid::Uuid;

use crate::models::NftMetadata;

pub async fn insert(
    pool: &PgPool,
    name: &str,
    description: &str,
    image: &str,
    attributes: &serde_json::Value,
) -> Result<NftMetadata, sqlx::Error> {
    sqlx::query_as::<_, NftMetadata>(
        r#"
        INSERT INTO nft_metadata (name, description, image, attributes)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(image)
    .bind(attributes)
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<NftMetadata>, sqlx::Error> {
    sqlx::query_as::<_, NftMetadata>("SELECT * FROM nft_metadata WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
