//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers which block the current thread will stall the worker that runs them, so any I/O
//! (database calls, provider calls) must be awaited, never performed synchronously.
//!
//! Payment routes live in [`crate::payment_routes`] and catalog routes in
//! [`crate::catalog_routes`].

use actix_web::{get, web, HttpResponse, Responder};
use farmgate_engine::{
    db_types::Role,
    order_objects::{OrderAmendment, OrderRequest},
    DeliveryApi,
    MarketplaceDatabase,
    OrderFlowApi,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{OrderResult, OrdersQuery},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(place_order => Post "/orders" impl MarketplaceDatabase);
/// Place a multi-line order on behalf of the authenticated shop.
///
/// The order, its lines and the matching stock reservations are written atomically; a request
/// that loses a stock race to a concurrent order comes back as a 400 naming the product, with
/// nothing written.
pub async fn place_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order for user {}", claims.sub);
    let full_order = api.place_order(claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(full_order)))
}

route!(my_orders => Get "/orders" impl MarketplaceDatabase);
/// The caller's orders, newest first. Shops see orders they placed, farmers see orders placed
/// against them, admins see everything. `?status=` narrows the result.
pub async fn my_orders<B: MarketplaceDatabase>(
    claims: JwtClaims,
    query: web::Query<OrdersQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user {}", claims.sub);
    let statuses = query.into_inner().status.map(|s| vec![s]);
    let orders = api.orders_for_actor(claims.sub, statuses).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl MarketplaceDatabase);
pub async fn order_by_id<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for user {}", claims.sub);
    let full_order = api.fetch_full_order(claims.sub, order_id).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(full_order)))
}

route!(amend_order => Patch "/orders/{id}" impl MarketplaceDatabase);
/// PATCH an order: mutable field edits and/or a status transition. Role gates and the transition
/// table are enforced by the order flow; cancellation returns reserved stock.
pub async fn amend_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<OrderAmendment>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH order {order_id} by user {}", claims.sub);
    let order = api.amend_order(claims.sub, order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------  Deliveries  ----------------------------------------------------

route!(delivery_for_order => Get "/deliveries/order/{order_id}" impl MarketplaceDatabase);
pub async fn delivery_for_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET delivery for order {order_id} for user {}", claims.sub);
    let delivery = api.delivery_for_order(claims.sub, order_id).await?;
    Ok(HttpResponse::Ok().json(delivery))
}

route!(update_delivery => Patch "/deliveries/order/{order_id}" impl MarketplaceDatabase where requires [Role::Admin]);
/// Operators drive the delivery through the courier states. Marking it `delivered` also moves
/// the parent order to `delivered`.
pub async fn update_delivery<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<farmgate_engine::delivery_objects::DeliveryUpdate>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH delivery for order {order_id} by admin {}", claims.sub);
    let sync = api.update_delivery(claims.sub, order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(sync.delivery))
}
