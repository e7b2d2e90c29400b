//! The generic resource controller: one [`ResourceDescriptor`] served over a
//! CRUD router.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | `GET` | `/` | [`ApiController::index`] |
//! | `POST` | `/` | [`ApiController::store`] |
//! | `GET` | `/create` | [`ApiController::create`] (501) |
//! | `GET` | `/{id}` | [`ApiController::show`] |
//! | `PUT`, `PATCH` | `/{id}` | [`ApiController::update`] |
//! | `DELETE` | `/{id}` | [`ApiController::destroy`] |
//! | `GET` | `/{id}/edit` | [`ApiController::edit`] (501) |
//!
//! Any other method on these paths answers 405 with the error envelope.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, Query, State},
    routing::get,
};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ColumnType, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, IdenStatic, IntoActiveModel, Iterable, ModelTrait,
    PaginatorTrait, PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect,
    TryIntoModel, Value,
    sea_query::{IntoValueTuple, ValueTuple},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use super::descriptor::ResourceDescriptor;
use crate::database::load_includes;
use crate::errors::ApiError;
use crate::filtering::{ColumnKind, Limit, compose_filters, compose_search, parse_sort};
use crate::models::QueryOptions;
use crate::response::{ApiResponse, Cursor, Envelope};

/// Serves one resource. Cheap to clone; the descriptor is shared.
pub struct ApiController<E: EntityTrait> {
    descriptor: Arc<ResourceDescriptor<E>>,
    db: DatabaseConnection,
}

impl<E: EntityTrait> Clone for ApiController<E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            db: self.db.clone(),
        }
    }
}

/// Read the resource object under `key` from a raw request body.
fn payload(body: &[u8], key: &str) -> Result<JsonValue, ApiError> {
    let empty = || ApiError::bad_request("Empty data");
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(empty());
    }
    let mut document: JsonValue =
        serde_json::from_slice(body).map_err(|_| ApiError::wrong_arguments())?;
    match document.as_object_mut().and_then(|object| object.remove(key)) {
        Some(JsonValue::Object(fields)) if !fields.is_empty() => Ok(JsonValue::Object(fields)),
        _ => Err(empty()),
    }
}

/// Payload that could not be turned into a record.
fn payload_error(err: DbErr) -> ApiError {
    match err {
        DbErr::Json(details) => {
            tracing::debug!(details = %details, "Rejected payload");
            ApiError::wrong_arguments()
        }
        other => ApiError::from(other),
    }
}

/// A JSON value that deserializes into a column of this type.
fn placeholder(column_type: &ColumnType) -> JsonValue {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned
        | ColumnType::Float
        | ColumnType::Double
        | ColumnType::Decimal(_)
        | ColumnType::Money(_) => JsonValue::from(0),
        ColumnType::Boolean => JsonValue::Bool(false),
        ColumnType::Uuid => JsonValue::from("00000000-0000-0000-0000-000000000000"),
        ColumnType::Date => JsonValue::from("1970-01-01"),
        ColumnType::Time => JsonValue::from("00:00:00"),
        ColumnType::DateTime | ColumnType::Timestamp => JsonValue::from("1970-01-01T00:00:00"),
        ColumnType::TimestampWithTimeZone => JsonValue::from("1970-01-01T00:00:00Z"),
        ColumnType::Json | ColumnType::JsonBinary => JsonValue::Null,
        ColumnType::Array(_) => JsonValue::Array(Vec::new()),
        _ => JsonValue::from(""),
    }
}

/// Fill every column absent from `payload` with a placeholder so the model
/// deserializes, returning those columns. They must be unset again before
/// the record is written.
fn fill_missing<E: EntityTrait>(payload: &mut JsonValue) -> Vec<E::Column> {
    let Some(fields) = payload.as_object_mut() else {
        return Vec::new();
    };
    let mut missing = Vec::new();
    for column in E::Column::iter() {
        if fields.contains_key(column.as_str()) {
            continue;
        }
        let def = column.def();
        let value = if def.is_null() {
            JsonValue::Null
        } else {
            placeholder(def.get_column_type())
        };
        fields.insert(column.as_str().to_string(), value);
        missing.push(column);
    }
    missing
}

fn tuple_values(tuple: ValueTuple) -> Vec<Value> {
    match tuple {
        ValueTuple::One(a) => vec![a],
        ValueTuple::Two(a, b) => vec![a, b],
        ValueTuple::Three(a, b, c) => vec![a, b, c],
        ValueTuple::Many(values) => values,
    }
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn route_not_found() -> ApiError {
    ApiError::not_found()
}

impl<E> ApiController<E>
where
    E: EntityTrait + Sync + 'static,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: TryIntoModel<E::Model> + ActiveModelBehavior + Send + Sync,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: FromStr,
{
    pub fn new(descriptor: ResourceDescriptor<E>, db: DatabaseConnection) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            db,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &ResourceDescriptor<E> {
        &self.descriptor
    }

    /// List records: filters, search, sort, window, count, includes.
    ///
    /// `params` holds every raw query parameter; filter values are read from
    /// it under the transport key of each filterable field.
    ///
    /// # Errors
    ///
    /// 400 for malformed filter values or a sort field that is not sortable,
    /// 500 for database failures.
    pub async fn index(
        &self,
        options: &QueryOptions,
        params: &HashMap<String, String>,
    ) -> Result<ApiResponse, ApiError> {
        let descriptor = &*self.descriptor;
        let backend = self.db.get_database_backend();

        let filters = compose_filters(descriptor.filterable(), params)?;
        let search = compose_search(options.search_text(), descriptor.searchable());

        let mut condition = Condition::all();
        for set in filters.iter().chain(search.iter()) {
            condition = condition.add(descriptor.graph().lower(set, backend)?);
        }

        let sort = parse_sort(options.sort.as_deref().unwrap_or_default());
        let mut ordering = Vec::with_capacity(sort.fields().len());
        for field in &sort {
            let column = descriptor.sort_column(&field.field).ok_or_else(|| {
                ApiError::bad_request(format!("Unknown sort field '{}'", field.field))
            })?;
            ordering.push((column, field.direction));
        }

        let window = descriptor.window(options.offset.as_deref(), options.limit.as_deref());

        tracing::debug!(
            resource = descriptor.name(),
            filters = filters.as_ref().map_or(0, |set| set.len()),
            search = search.as_ref().map_or(0, |set| set.len()),
            sort = ?sort,
            offset = window.offset,
            limit = ?window.limit,
            "Listing records"
        );

        let filtered = descriptor.query().filter(condition);
        let total = if window.limit.is_bounded() {
            filtered.clone().count(&self.db).await?
        } else {
            0
        };

        let mut select = filtered;
        for (column, direction) in ordering {
            select = select.order_by(column, direction.into());
        }
        // Without a limit there is no window at all, offset included
        if let Limit::Bounded(limit) = window.limit {
            select = select.offset(window.db_offset()).limit(limit);
        }

        let models = select.all(&self.db).await?;
        let included =
            load_includes::<E, _>(&self.db, descriptor.graph(), descriptor.includes(), &models)
                .await?;

        let data = models
            .iter()
            .zip(included.iter())
            .map(|(model, included)| descriptor.transformer().transform(model, included))
            .collect();

        Ok(ApiResponse::ok(Envelope::collection(
            descriptor.plural_key(),
            data,
            Cursor::for_window(&window, total),
        )))
    }

    /// Fetch one record by primary key, or by the `use_as_id` column.
    ///
    /// # Errors
    ///
    /// 400 when `use_as_id` names no column, 404 when nothing matches.
    pub async fn show(&self, id: &str, use_as_id: Option<&str>) -> Result<ApiResponse, ApiError> {
        let model = self.find(id, use_as_id).await?;
        self.respond_with_item(model).await
    }

    /// Create a record from the object under the singular key.
    ///
    /// # Errors
    ///
    /// 400 for an empty or malformed body and for failed validation, 409 for a
    /// unique-constraint violation.
    pub async fn store(&self, body: &[u8]) -> Result<ApiResponse, ApiError> {
        let descriptor = &*self.descriptor;
        let payload = payload(body, descriptor.singular_key())?;
        descriptor.validator().rules_for_create(&payload)?;

        let mut fields = payload;
        let missing = fill_missing::<E>(&mut fields);
        let mut active = E::ActiveModel::from_json(fields).map_err(payload_error)?;
        // Unsent columns fall back to database defaults
        for column in missing {
            active.not_set(column);
        }
        let model = active.insert(&self.db).await?;
        tracing::debug!(resource = descriptor.name(), "Created record");

        self.respond_with_item(model).await
    }

    /// Update a record with the object under the singular key. Fields absent
    /// from the payload keep their stored values.
    ///
    /// # Errors
    ///
    /// 400 for an empty body or failed validation, 404 when the record does
    /// not exist. The existence check runs before validation.
    pub async fn update(&self, id: &str, body: &[u8]) -> Result<ApiResponse, ApiError> {
        let descriptor = &*self.descriptor;
        let payload = payload(body, descriptor.singular_key())?;
        let model = self.find(id, None).await?;
        descriptor.validator().rules_for_update(id, &payload)?;

        let mut merged =
            serde_json::to_value(&model).map_err(|err| ApiError::internal(Some(err.to_string())))?;
        if let (JsonValue::Object(stored), JsonValue::Object(changes)) = (&mut merged, payload) {
            stored.extend(changes);
        }

        let mut active = model.into_active_model();
        active.set_from_json(merged).map_err(payload_error)?;
        let updated = active.update(&self.db).await?;
        tracing::debug!(resource = descriptor.name(), id, "Updated record");

        self.respond_with_item(updated).await
    }

    /// # Errors
    ///
    /// 404 when the record does not exist.
    pub async fn destroy(&self, id: &str) -> Result<ApiResponse, ApiError> {
        let model = self.find(id, None).await?;
        model.delete(&self.db).await?;
        tracing::debug!(resource = self.descriptor.name(), id, "Deleted record");
        Ok(ApiResponse::message("Deleted"))
    }

    /// Form endpoint, not served by an API.
    ///
    /// # Errors
    ///
    /// Always 501.
    pub fn create(&self) -> Result<ApiResponse, ApiError> {
        Err(ApiError::not_implemented())
    }

    /// Form endpoint, not served by an API.
    ///
    /// # Errors
    ///
    /// Always 501.
    pub fn edit(&self, _id: &str) -> Result<ApiResponse, ApiError> {
        Err(ApiError::not_implemented())
    }

    async fn respond_with_item(&self, model: E::Model) -> Result<ApiResponse, ApiError> {
        let descriptor = &*self.descriptor;
        let models = [model];
        let included =
            load_includes::<E, _>(&self.db, descriptor.graph(), descriptor.includes(), &models)
                .await?;
        let included = included.into_iter().next().unwrap_or_default();
        let data = descriptor.transformer().transform(&models[0], &included);
        Ok(ApiResponse::ok(Envelope::item(descriptor.singular_key(), data)))
    }

    async fn find(&self, id: &str, use_as_id: Option<&str>) -> Result<E::Model, ApiError> {
        let condition = match use_as_id {
            Some(name) => Self::column_condition(name, id)?,
            None => Self::primary_key_condition(id),
        };
        // A key that cannot be parsed cannot match anything
        let Some(condition) = condition else {
            return Err(ApiError::not_found());
        };
        self.descriptor
            .query()
            .filter(condition)
            .one(&self.db)
            .await?
            .ok_or_else(ApiError::not_found)
    }

    fn primary_key_condition(id: &str) -> Option<Condition> {
        let value = <E::PrimaryKey as PrimaryKeyTrait>::ValueType::from_str(id).ok()?;
        Some(
            E::PrimaryKey::iter()
                .zip(tuple_values(value.into_value_tuple()))
                .fold(Condition::all(), |condition, (key, value)| {
                    condition.add(key.into_column().eq(value))
                }),
        )
    }

    fn column_condition(name: &str, id: &str) -> Result<Option<Condition>, ApiError> {
        let column = E::Column::from_str(name)
            .map_err(|_| ApiError::bad_request(format!("Unknown field '{name}'")))?;
        let kind = ColumnKind::from(column.def().get_column_type());
        Ok(kind
            .parse(id)
            .map(|value| Condition::all().add(column.eq(Value::from(value)))))
    }

    // ============================================================================
    // Router
    // ============================================================================

    /// The CRUD routes of this resource, ready to be nested under a prefix.
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(Self::index_handler)
                    .post(Self::store_handler)
                    .fallback(method_not_allowed),
            )
            .route(
                "/create",
                get(Self::create_handler).fallback(method_not_allowed),
            )
            .route(
                "/{id}",
                get(Self::show_handler)
                    .put(Self::update_handler)
                    .patch(Self::update_handler)
                    .delete(Self::destroy_handler)
                    .fallback(method_not_allowed),
            )
            .route(
                "/{id}/edit",
                get(Self::edit_handler).fallback(method_not_allowed),
            )
            .fallback(route_not_found)
            .with_state(self.clone())
    }

    async fn index_handler(
        State(controller): State<Self>,
        Query(options): Query<QueryOptions>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<ApiResponse, ApiError> {
        controller.index(&options, &params).await
    }

    async fn show_handler(
        State(controller): State<Self>,
        Path(id): Path<String>,
        Query(options): Query<QueryOptions>,
    ) -> Result<ApiResponse, ApiError> {
        controller.show(&id, options.use_as_id.as_deref()).await
    }

    async fn store_handler(
        State(controller): State<Self>,
        body: Bytes,
    ) -> Result<ApiResponse, ApiError> {
        controller.store(&body).await
    }

    async fn update_handler(
        State(controller): State<Self>,
        Path(id): Path<String>,
        body: Bytes,
    ) -> Result<ApiResponse, ApiError> {
        controller.update(&id, &body).await
    }

    async fn destroy_handler(
        State(controller): State<Self>,
        Path(id): Path<String>,
    ) -> Result<ApiResponse, ApiError> {
        controller.destroy(&id).await
    }

    async fn create_handler(State(controller): State<Self>) -> Result<ApiResponse, ApiError> {
        controller.create()
    }

    async fn edit_handler(
        State(controller): State<Self>,
        Path(id): Path<String>,
    ) -> Result<ApiResponse, ApiError> {
        controller.edit(&id)
    }
}
