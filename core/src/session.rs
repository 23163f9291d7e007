//! Login bootstrap: access code to an authenticated, company-scoped session.
//!
//! # Design
//! The steps run in a fixed order and stop at the first failure:
//! 1. look the access code up in the `ConfigStore`;
//! 2. `authenticate` with the stored technical user;
//! 3. read the user's `company_ids` from `res.users`;
//! 4. read those companies' names from `res.company` and pick one using the
//!    client's company filter.
//!
//! The resulting `Session` carries everything later calls need, including
//! the credential pair that must accompany every `object` call.

use serde::Deserialize;
use tracing::{debug, info};

use crate::client::OdooClient;
use crate::config::{normalize_access_code, ClientConfig, ConfigStore, ALL_COMPANIES};
use crate::error::RpcError;
use crate::http::Transport;
use crate::query::{Domain, SearchOptions};
use crate::value::{Struct, Value};

/// An authenticated connection scoped to one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub server_url: String,
    pub database: String,
    pub username: String,
    pub api_key: String,
    pub uid: i64,
    pub use_proxy: bool,
    pub company_id: i64,
    pub company_name: String,
}

impl Session {
    /// A client for this session's server. Proxy base overrides are not
    /// carried over; pass one to `OdooClient::with_proxy_base` if needed.
    pub fn client(&self) -> OdooClient {
        OdooClient::new(&self.server_url, &self.database, self.use_proxy)
    }

    /// `{"allowed_company_ids": [company_id]}` for multi-company reads.
    pub fn company_context(&self) -> Struct {
        Struct::new().with("allowed_company_ids", vec![self.company_id])
    }
}

#[derive(Debug, Deserialize)]
struct UserCompanies {
    company_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Company {
    id: i64,
    name: String,
}

/// Resolve `access_code` through `store` and log in.
///
/// `configure` lets the caller adjust the client built from the stored
/// config (for example to route through a different proxy).
pub fn login<S, T, F>(
    store: &S,
    transport: &T,
    access_code: &str,
    configure: F,
) -> Result<Session, RpcError>
where
    S: ConfigStore + ?Sized,
    T: Transport,
    F: FnOnce(OdooClient) -> OdooClient,
{
    let code = normalize_access_code(access_code);
    let config = store
        .client_by_code(&code)
        .ok_or_else(|| RpcError::UnknownAccessCode(code.clone()))?;
    if !config.is_active {
        return Err(RpcError::InactiveClient(code));
    }
    let client = configure(OdooClient::new(&config.url, &config.db, config.use_proxy));
    login_with_config(&client, transport, &config)
}

/// Steps 2–4 of the login for an already resolved client config.
pub fn login_with_config<T: Transport>(
    client: &OdooClient,
    transport: &T,
    config: &ClientConfig,
) -> Result<Session, RpcError> {
    let uid = client.authenticate(transport, &config.username, &config.api_key)?;
    debug!(uid, code = %config.code, "authenticated");

    let users: Vec<UserCompanies> = client.search_read_as(
        transport,
        uid,
        &config.api_key,
        "res.users",
        Domain::new().filter("id", "=", uid),
        &["company_ids"],
        &SearchOptions::new(),
    )?;
    let user = users.into_iter().next().ok_or(RpcError::UserNotFound(uid))?;
    if user.company_ids.is_empty() {
        return Err(RpcError::NoCompanies);
    }

    let companies: Vec<Company> = client.search_read_as(
        transport,
        uid,
        &config.api_key,
        "res.company",
        Domain::new().filter("id", "in", Value::from(user.company_ids)),
        &["name"],
        &SearchOptions::new(),
    )?;
    let company = pick_company(&companies, &config.company_filter)
        .ok_or_else(|| RpcError::CompanyNotFound(config.company_filter.clone()))?;

    info!(uid, company = %company.name, code = %config.code, "session established");
    Ok(Session {
        server_url: client.server_url().to_string(),
        database: client.database().to_string(),
        username: config.username.clone(),
        api_key: config.api_key.clone(),
        uid,
        use_proxy: client.use_proxy(),
        company_id: company.id,
        company_name: company.name,
    })
}

/// `ALL` takes the first company; any other filter matches a company whose
/// name contains it, ignoring case.
fn pick_company(companies: &[Company], filter: &str) -> Option<Company> {
    if filter == ALL_COMPANIES {
        return companies.first().cloned();
    }
    let needle = filter.to_uppercase();
    companies
        .iter()
        .find(|c| c.name.to_uppercase().contains(&needle))
        .cloned()
}
