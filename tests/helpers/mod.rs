// ==========================================
// 集成测试共享模块
// ==========================================

#![allow(dead_code)]

pub mod mock_stores;
pub mod test_data_builder;
