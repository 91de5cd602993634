//! 核心响应处理模块

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API 响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub request_id: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            request_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// 分页响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl PaginationInfo {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64 + limit as u64 - 1) / limit as u64) as u32
        };

        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// 分页查询参数
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// 规范化为 (page, limit)：page 从 1 开始，limit 限制在 1..=100
    pub fn normalize(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        (page, limit)
    }

    pub fn offset(&self) -> u64 {
        let (page, limit) = self.normalize();
        (page as u64 - 1) * limit as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_normalize() {
        assert_eq!(PageQuery::default().normalize(), (1, 10));
        let query = PageQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(query.normalize(), (1, 100));

        let query = PageQuery {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(PaginationInfo::new(1, 10, 0).total_pages, 0);
        assert_eq!(PaginationInfo::new(1, 10, 10).total_pages, 1);
        assert_eq!(PaginationInfo::new(1, 10, 11).total_pages, 2);
    }
}
