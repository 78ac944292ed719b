//! Read queries against the department indexer and the OpenR&D task indexer.

use alloy_primitives::{Address, B256, U256};
use ovc_types::metadata::parse_cached;
use ovc_types::{
    DaoMetadata, DaoRole, Department, DepartmentRef, IndexedTask, OptimisticPayments, TaskFilter,
    TaskRef, User,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::IndexerError;

#[derive(Clone, Debug)]
pub struct IndexerClient {
    indexer_url: String,
    openrd_indexer_url: String,
    http: reqwest::Client,
}

impl IndexerClient {
    /// `indexer_url` serves departments and payments, `openrd_indexer_url` serves tasks and users.
    pub fn new(indexer_url: impl Into<String>, openrd_indexer_url: impl Into<String>) -> Self {
        Self {
            indexer_url: trim(indexer_url.into()),
            openrd_indexer_url: trim(openrd_indexer_url.into()),
            http: reqwest::Client::new(),
        }
    }

    pub async fn departments(&self) -> Result<Vec<DepartmentRef>, IndexerError> {
        self.get("Fetching departments", format!("{}/departments", self.indexer_url))
            .await
    }

    pub async fn department(&self, hash: B256) -> Result<Department, IndexerError> {
        self.get(
            "Fetching department",
            format!("{}/department/{hash}", self.indexer_url),
        )
        .await
    }

    pub async fn dao_role(&self, dao: Address) -> Result<DaoRole, IndexerError> {
        self.get(
            "Fetching dao role",
            format!("{}/daoRole/{dao}", self.indexer_url),
        )
        .await
    }

    pub async fn optimistic_payments(
        &self,
        dao: Address,
    ) -> Result<OptimisticPayments, IndexerError> {
        self.get(
            "Fetching optimistic payments",
            format!("{}/optimisticPayments/{dao}", self.indexer_url),
        )
        .await
    }

    pub async fn task(&self, chain_id: u64, task_id: U256) -> Result<IndexedTask, IndexerError> {
        self.get(
            "Fetching task",
            format!("{}/task/{chain_id}/{task_id}", self.openrd_indexer_url),
        )
        .await
    }

    pub async fn user(&self, address: Address) -> Result<User, IndexerError> {
        self.get(
            "Fetching user",
            format!("{}/user/{address}", self.openrd_indexer_url),
        )
        .await
    }

    /// Title and description a DAO published as its user metadata; empty when unset or malformed.
    pub async fn dao_metadata(&self, dao: Address) -> Result<DaoMetadata, IndexerError> {
        let user = self.user(dao).await?;
        Ok(parse_cached(user.metadata.as_deref()).unwrap_or_default())
    }

    pub async fn filter_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRef>, IndexerError> {
        let what = "Fetching department tasks";
        let response = self
            .http
            .post(format!("{}/filterTasks/", self.openrd_indexer_url))
            .json(filter)
            .send()
            .await?;
        decode(what, response).await
    }

    /// Tasks managed by `dao` on `chain_id`.
    pub async fn department_tasks(
        &self,
        dao: Address,
        chain_id: u64,
    ) -> Result<Vec<TaskRef>, IndexerError> {
        self.filter_tasks(&TaskFilter::managed_by(dao, chain_id))
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        what: &'static str,
        url: String,
    ) -> Result<T, IndexerError> {
        debug!(%url, "indexer query");
        let response = self.http.get(url).send().await?;
        decode(what, response).await
    }
}

async fn decode<T: DeserializeOwned>(
    what: &'static str,
    response: reqwest::Response,
) -> Result<T, IndexerError> {
    let status = response.status();
    let body = response.text().await?;
    if status != reqwest::StatusCode::OK {
        warn!(what, status = status.as_u16(), "indexer query failed");
        return Err(IndexerError::Status {
            what,
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|source| IndexerError::Decode { what, source })
}

fn trim(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};
    use mockito::Matcher;
    use ovc_types::TaskState;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> IndexerClient {
        IndexerClient::new(
            format!("{}/indexer", server.url()),
            format!("{}/openrd-indexer/", server.url()),
        )
    }

    #[tokio::test]
    async fn lists_departments_and_reads_department() {
        let mut server = mockito::Server::new_async().await;
        let hash = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
        server
            .mock("GET", "/indexer/departments")
            .with_status(200)
            .with_body(json!([{ "hash": hash }]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", format!("/indexer/department/{hash}").as_str())
            .with_status(200)
            .with_body(
                json!({"name": "Development", "dao": "0x0000000000000000000000000000000000000d40"})
                    .to_string(),
            )
            .create_async()
            .await;

        let indexer = client(&server);
        let departments = indexer.departments().await.unwrap();
        assert_eq!(departments, vec![DepartmentRef { hash }]);
        let department = indexer.department(hash).await.unwrap();
        assert_eq!(department.name, "Development");
    }

    #[tokio::test]
    async fn decodes_bigint_role_and_payments() {
        let mut server = mockito::Server::new_async().await;
        let dao = address!("0000000000000000000000000000000000000d40");
        server
            .mock("GET", format!("/indexer/daoRole/{dao}").as_str())
            .with_status(200)
            .with_body(r#"{"role":{"__type":"bigint","value":"340282366920938463463374607431768211456"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", format!("/indexer/optimisticPayments/{dao}").as_str())
            .with_status(200)
            .with_body(
                json!({
                    "0": {
                        "actions": [],
                        "executableFrom": {"__type": "bigint", "value": "10"},
                        "executed": true,
                        "rejected": false
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let indexer = client(&server);
        let role = indexer.dao_role(dao).await.unwrap();
        assert_eq!(role.role, U256::from(1u64) << 128);
        let payments = indexer.optimistic_payments(dao).await.unwrap();
        assert!(payments[&0].executed);
        assert_eq!(payments[&0].executable_from, 10);
    }

    #[tokio::test]
    async fn non_200_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/indexer/departments")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = client(&server).departments().await.unwrap_err();
        match err {
            IndexerError::Status { what, status, body } => {
                assert_eq!(what, "Fetching departments");
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn filters_department_tasks_by_checksummed_manager() {
        let mut server = mockito::Server::new_async().await;
        let dao = address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        let mock = server
            .mock("POST", "/openrd-indexer/filterTasks/")
            .match_body(Matcher::Json(json!({
                "manager": {"equal": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"},
                "chainId": {"equal": 137}
            })))
            .with_status(200)
            .with_body(r#"[{"chainId":137,"taskId":{"__type":"bigint","value":"4"}}]"#)
            .create_async()
            .await;

        let tasks = client(&server)
            .department_tasks(dao, 137)
            .await
            .unwrap();
        assert_eq!(
            tasks,
            vec![TaskRef {
                chain_id: 137,
                task_id: U256::from(4u64)
            }]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reads_task_and_dao_metadata() {
        let mut server = mockito::Server::new_async().await;
        let dao = address!("0000000000000000000000000000000000000d40");
        server
            .mock("GET", "/openrd-indexer/task/137/4")
            .with_status(200)
            .with_body(
                json!({
                    "manager": dao,
                    "state": 1,
                    "executorApplication": 0,
                    "applications": {"0": {"applicant": "0x00000000000000000000000000000000000000aa"}}
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", format!("/openrd-indexer/user/{dao}").as_str())
            .with_status(200)
            .with_body(json!({"metadata": "{\"title\":\"Dev\",\"description\":\"Builders\"}"}).to_string())
            .create_async()
            .await;

        let indexer = client(&server);
        let task = indexer.task(137, U256::from(4u64)).await.unwrap();
        assert_eq!(task.state, TaskState::Taken);
        assert_eq!(task.manager, dao);

        let metadata = indexer.dao_metadata(dao).await.unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Dev"));
        assert_eq!(metadata.description.as_deref(), Some("Builders"));
    }
}
