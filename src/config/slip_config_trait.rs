// ==========================================
// 玻璃生产出入库单据 - 单据配置读取 Trait
// ==========================================
// 职责: 定义单据引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::error::Error;

/// 单据编号默认前缀
pub const DEFAULT_SLIP_CODE_PREFIX: &str = "PH";

/// 原材料默认计量单位（片）
pub const DEFAULT_SHEET_UOM: &str = "tấm";

// ==========================================
// SlipConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait SlipConfigReader: Send + Sync {
    /// 单据编号前缀
    ///
    /// # 默认值
    /// - PH
    fn get_slip_code_prefix(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 目录原材料的计量单位（忽略大小写比较）
    ///
    /// # 默认值
    /// - tấm
    fn get_sheet_uom(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 切玻璃单据终审时是否要求每条原材料行至少有一条出边
    ///
    /// # 默认值
    /// - true
    fn get_finalize_requires_mapping(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 一次性读取全部单据配置（读取失败的项回退默认值）
    fn load_settings(&self) -> SlipSettings {
        let defaults = SlipSettings::default();
        SlipSettings {
            slip_code_prefix: self
                .get_slip_code_prefix()
                .unwrap_or(defaults.slip_code_prefix),
            sheet_uom: self.get_sheet_uom().unwrap_or(defaults.sheet_uom),
            finalize_requires_mapping: self
                .get_finalize_requires_mapping()
                .unwrap_or(defaults.finalize_requires_mapping),
        }
    }
}

/// 单据配置快照
#[derive(Debug, Clone, PartialEq)]
pub struct SlipSettings {
    pub slip_code_prefix: String,
    pub sheet_uom: String,
    pub finalize_requires_mapping: bool,
}

impl Default for SlipSettings {
    fn default() -> Self {
        Self {
            slip_code_prefix: DEFAULT_SLIP_CODE_PREFIX.to_string(),
            sheet_uom: DEFAULT_SHEET_UOM.to_string(),
            finalize_requires_mapping: true,
        }
    }
}
