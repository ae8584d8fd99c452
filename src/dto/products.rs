use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub partner_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub category_ids: Option<Vec<i32>>,
}
