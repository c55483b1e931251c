use crate::domain::model::{Member, MemberData};
use crate::domain::report::{MemberActivity, ReviewReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// Human-readable location of `path`, for log and console output.
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn team_name(&self) -> &str;
    fn year(&self) -> i32;
    fn members(&self) -> &[Member];
    fn project_keywords(&self) -> &BTreeMap<String, Vec<String>>;
}

/// Where a member's activity comes from. Source failures are absorbed by the
/// implementation; a member always gets some (possibly empty) data.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn collect(&self, member: &Member) -> MemberData;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<MemberActivity>>;
    async fn transform(&self, data: Vec<MemberActivity>) -> Result<ReviewReport>;
    async fn load(&self, report: ReviewReport) -> Result<String>;
}
