use std::str::FromStr;

use thiserror::Error;

use super::ReportRequest;
use crate::task::StatusFilter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("不是状态按钮回调: {0}")]
    NotStatus(String),
    #[error("无效的用户ID: {0}")]
    InvalidUser(String),
    #[error("未知的操作: {0}")]
    UnknownVerb(String),
    #[error("缺少参数: {0}")]
    MissingArgument(&'static str),
    #[error("无效的参数: {0}")]
    InvalidArgument(String),
}

/// 状态消息按钮对应的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusAction {
    Overview,
    PreviousPage,
    NextPage,
    PageStep(usize),
    Filter(StatusFilter),
    Refresh,
}

impl StatusAction {
    /// 解析 `status <uid> <verb> [arg]` 形式的回调数据
    pub fn parse(payload: &str) -> Result<(i64, StatusAction), ActionError> {
        let mut parts = payload.split_whitespace();
        if parts.next() != Some("status") {
            return Err(ActionError::NotStatus(payload.to_string()));
        }
        let uid = parts.next().ok_or(ActionError::MissingArgument("user_id"))?;
        let uid = uid
            .parse::<i64>()
            .map_err(|_| ActionError::InvalidUser(uid.to_string()))?;
        let verb = parts.next().ok_or(ActionError::MissingArgument("verb"))?;

        let action = match verb {
            "ov" => StatusAction::Overview,
            "pre" => StatusAction::PreviousPage,
            "nex" => StatusAction::NextPage,
            "ref" => StatusAction::Refresh,
            "ps" => {
                let arg = parts.next().ok_or(ActionError::MissingArgument("page_step"))?;
                let step = arg
                    .parse::<usize>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| ActionError::InvalidArgument(arg.to_string()))?;
                StatusAction::PageStep(step)
            }
            "st" => {
                let arg = parts.next().ok_or(ActionError::MissingArgument("status"))?;
                let filter = StatusFilter::from_str(arg).map_err(ActionError::InvalidArgument)?;
                StatusAction::Filter(filter)
            }
            other => return Err(ActionError::UnknownVerb(other.to_string())),
        };
        Ok((uid, action))
    }
}

/// 一条状态消息当前的浏览状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub page_no: i64,
    pub page_step: usize,
    pub status: StatusFilter,
    pub is_user: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_step: 1,
            status: StatusFilter::All,
            is_user: false,
        }
    }
}

impl StatusView {
    pub fn for_user() -> Self {
        Self {
            is_user: true,
            ..Self::default()
        }
    }

    fn step(&self) -> i64 {
        i64::try_from(self.page_step).unwrap_or(i64::MAX)
    }

    // 页码越界由生成报告时回绕处理
    pub fn apply(&mut self, action: &StatusAction) {
        match action {
            StatusAction::Overview => {
                self.is_user = !self.is_user;
                self.page_no = 1;
            }
            StatusAction::PreviousPage => self.page_no = self.page_no.saturating_sub(self.step()),
            StatusAction::NextPage => self.page_no = self.page_no.saturating_add(self.step()),
            StatusAction::PageStep(step) => self.page_step = *step,
            StatusAction::Filter(filter) => {
                self.status = filter.clone();
                self.page_no = 1;
            }
            StatusAction::Refresh => {}
        }
    }

    pub fn request(&self, requester_id: i64) -> ReportRequest {
        ReportRequest {
            requester_id,
            is_user: self.is_user,
            page_no: self.page_no,
            status: self.status.clone(),
            page_step: self.page_step,
        }
    }
}
