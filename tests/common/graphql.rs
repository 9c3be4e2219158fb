use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use actix_http::Request;
use actix_identity::IdentityMiddleware;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use nodewatch_server::backend::MemoryBackend;
use nodewatch_server::security::PasswordHasher;
use nodewatch_server::web::api_service;
use nodewatch_server::AppData;

pub const ADMIN_EMAIL: &str = "admin@nodewatch.local";
pub const ADMIN_PASSWORD: &str = "password";

lazy_static! {
    static ref LOGGER: () = {
        let _ = env_logger::builder().is_test(true).try_init();
    };
}

#[derive(Deserialize, Debug)]
#[allow(dead_code)]
pub struct ExecutionError {
    pub locations: Option<Value>,
    pub path: Option<Vec<Value>>,
    pub message: String,
    pub extensions: Option<HashMap<String, Value>>,
}

#[derive(Deserialize)]
pub struct GraphQLResult {
    pub data: Option<Value>,
    pub errors: Option<Vec<ExecutionError>>,
}

pub trait ExecutionErrorContainer {
    fn expect_service_error(&self, error_type: &str);
}

impl<T> ExecutionErrorContainer for Result<T, Vec<ExecutionError>> {
    fn expect_service_error(&self, error_type: &str) {
        let errors = match self.as_ref().err() {
            Some(x) => x,
            None => panic!("Expected errored result"),
        };

        if !errors.iter().any(|x| error_type_of(x) == Some(error_type)) {
            panic!("Cannot find error: {} in {:?}", error_type, errors)
        }
    }
}

pub fn error_type_of(error: &ExecutionError) -> Option<&str> {
    error.extensions.as_ref().and_then(|x| x.get("type")).and_then(|x| x.as_str())
}

pub struct GraphQlQueryBuilder {
    query: String,
    variables: HashMap<String, Value>,
}

impl GraphQlQueryBuilder {
    pub fn query<S: Into<String>>(query: S) -> GraphQlQueryBuilder {
        GraphQlQueryBuilder {
            query: query.into(),
            variables: HashMap::new(),
        }
    }

    pub fn add_variable<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "query": self.query,
            "variables": self.variables,
        })
    }
}

pub fn query<S: Into<String>>(query: S) -> GraphQlQueryBuilder {
    GraphQlQueryBuilder::query(query)
}

fn json_object_extract_first(val: &Value) -> Option<Value> {
    val.as_object().and_then(|x| x.values().next()).cloned()
}

pub fn create_random_email() -> String {
    let data = rand::thread_rng().gen::<[u8; 8]>();
    format!("{}@nodewatch.test", hex::encode(data))
}

pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new("a".repeat(32)).with_cost(256, 1)
}

/// One client: its own cookie jar, the app shared with its clones.
pub struct GraphQlTester<S> {
    service: Rc<S>,
    pub data: AppData,
    pub backend: Arc<MemoryBackend>,
    cookies: HashMap<String, String>,
}

impl<S> Clone for GraphQlTester<S> {
    /// The clone starts signed out.
    fn clone(&self) -> Self {
        GraphQlTester {
            service: self.service.clone(),
            data: self.data.clone(),
            backend: self.backend.clone(),
            cookies: HashMap::new(),
        }
    }
}

impl<S, B> GraphQlTester<S>
    where S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
          B: MessageBody,
{
    pub async fn submit_raw(&mut self, query: GraphQlQueryBuilder) -> Result<Value, Vec<ExecutionError>> {
        let mut request = test::TestRequest::post()
            .uri("/api/graphql")
            .set_json(query.to_json());

        for (name, value) in self.cookies.iter() {
            request = request.cookie(Cookie::new(name.clone(), value.clone()));
        }

        let response = test::call_service(self.service.as_ref(), request.to_request()).await;
        for cookie in response.response().cookies() {
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        let body = test::read_body(response).await;
        let res: GraphQLResult = serde_json::from_slice(body.as_ref()).expect("Response is not GraphQL JSON");
        match res.errors {
            Some(errors) => Err(errors),
            None => Ok(res.data.unwrap_or(Value::Null)),
        }
    }

    pub async fn submit(&mut self, query: GraphQlQueryBuilder) -> Value {
        match self.submit_raw(query).await {
            Ok(val) => json_object_extract_first(&val).expect("Cannot parse value"),
            Err(errors) => {
                let errors = errors.iter()
                    .map(|x| x.message.clone())
                    .collect::<Vec<String>>()
                    .join("\n");
                panic!("{}", errors)
            },
        }
    }

    /// Copies another client's cookies, as a second device of the same user would.
    pub fn cookies_from(&mut self, other: &GraphQlTester<S>) {
        self.cookies = other.cookies.clone();
    }

    pub fn has_session_cookie(&self) -> bool {
        self.cookies.contains_key(api_service::SESSION_COOKIE)
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> Value {
        self.submit(
            query(r#"mutation signUp($data: SignUpForm!) {
                signUp(data: $data) { id email role }
            }"#).add_variable("data", json!({
                "email": email,
                "userId": "tester",
                "phoneNo": "5550100",
                "password": password,
                "confirmPassword": password,
            }))
        ).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Value {
        self.submit(
            query(r#"mutation login($data: LoginForm!) {
                login(data: $data) { state surface user { id email role } }
            }"#).add_variable("data", json!({
                "email": email,
                "password": password,
            }))
        ).await
    }

    pub async fn login_admin(&mut self) -> Value {
        self.data.setup_admin(ADMIN_EMAIL, ADMIN_PASSWORD.to_string(), true)
            .expect("Cannot set up admin");
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Signs up a fresh user and signs in as them, returning the user id.
    pub async fn create_and_login_user(&mut self, password: &str) -> (String, String) {
        let email = create_random_email();
        let user = self.sign_up(&email, password).await;
        self.login(&email, password).await;
        (user["id"].as_str().expect("id is not a string").to_string(), email)
    }

    pub async fn register_node(&mut self, node_id: &str, total_sensors: &str) -> Value {
        self.submit(
            query(r#"mutation registerNode($data: NodeForm!) {
                registerNode(data: $data) { id ownerId ownerEmail nodeId status statusKind totalSensors }
            }"#).add_variable("data", json!({
                "phone": "5550199",
                "nodeId": node_id,
                "location": "Greenhouse",
                "totalSensors": total_sensors,
            }))
        ).await
    }
}

pub async fn init_app() -> GraphQlTester<impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>> {
    lazy_static::initialize(&LOGGER);

    let backend = Arc::new(MemoryBackend::new(test_hasher()));
    let data = AppData::in_memory(backend.clone(), false);

    let service = test::init_service(
        App::new()
            .app_data(web::Data::new(data.clone()))
            .wrap(IdentityMiddleware::default())
            .wrap(api_service::session_middleware(&[41; 64], None))
            .configure(api_service::config)
    ).await;

    GraphQlTester {
        service: Rc::new(service),
        data,
        backend,
        cookies: HashMap::new(),
    }
}

pub trait IntoPrimitive {
    fn to_i64(&self) -> i64;
    fn to_str(&self) -> &str;
}

impl IntoPrimitive for Value {
    fn to_i64(&self) -> i64 {
        self.as_i64().expect("Value is not i64")
    }

    fn to_str(&self) -> &str {
        self.as_str().expect("Value is not string")
    }
}
