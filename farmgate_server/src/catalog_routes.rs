//! Catalog endpoints. Listings are public reads; every mutation is owner-gated by the catalog
//! API (the owning farmer, or an admin acting on a farmer's behalf).

use actix_web::{web, HttpResponse};
use farmgate_engine::{catalog_objects::ProductUpdate, CatalogApi, MarketplaceDatabase};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{JsonResponse, NewProductRequest, ProductListQuery},
    errors::ServerError,
    route,
};

route!(create_product => Post "/products" impl MarketplaceDatabase);
/// List a product. Farmers list under their own account; admins may list on behalf of a farmer
/// by supplying `farmer_id` in the body.
pub async fn create_product<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<NewProductRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST product by user {}", claims.sub);
    let product = body.into_inner().into_new_product(claims.sub);
    let created = api.create_product(claims.sub, product).await?;
    Ok(HttpResponse::Ok().json(created))
}

route!(list_products => Get "/products" impl MarketplaceDatabase);
/// The public catalog, newest first. `?farmer_id=`, `?category=` and `?name_like=` narrow the
/// listing; inactive products are never included.
pub async fn list_products<B: MarketplaceDatabase>(
    query: web::Query<ProductListQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.search(query.into_inner().into_filter()).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{id}" impl MarketplaceDatabase);
pub async fn product_by_id<B: MarketplaceDatabase>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET product {product_id}");
    let product = api.fetch_product(product_id).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(update_product => Patch "/products/{id}" impl MarketplaceDatabase);
pub async fn update_product<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ PATCH product {product_id} by user {}", claims.sub);
    let updated = api.update_product(claims.sub, product_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

route!(delete_product => Delete "/products/{id}" impl MarketplaceDatabase);
/// Remove a product from the catalog. Refused with a 400 while open orders still reference it.
pub async fn delete_product<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ DELETE product {product_id} by user {}", claims.sub);
    api.delete_product(claims.sub, product_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product {product_id} removed"))))
}
