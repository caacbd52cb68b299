// ==========================================
// 测试数据构建器
// ==========================================
// 职责: 以链式调用构造产品/计划产出/单据请求
// ==========================================

use glass_slip_engine::api::{
    CreateSlipRequest, MappingEdgeRequest, ProductionTargetRequest, SlipLineRequest,
};
use glass_slip_engine::domain::{Product, ProductionOrder, ProductionOutput};
use glass_slip_engine::domain::types::{ProductionOrderType, ProductionStatus};

// ==========================================
// ProductBuilder
// ==========================================
pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            product: Product {
                id: 0,
                product_code: code.to_string(),
                product_name: name.to_string(),
                product_type: Some("NVL".to_string()),
                uom: Some("tấm".to_string()),
                unit_price: Some(100_000.0),
            },
        }
    }

    pub fn product_type(mut self, t: &str) -> Self {
        self.product.product_type = Some(t.to_string());
        self
    }

    pub fn uom(mut self, uom: &str) -> Self {
        self.product.uom = Some(uom.to_string());
        self
    }

    pub fn build(self) -> Product {
        self.product
    }
}

// ==========================================
// 生产指令 / 计划产出
// ==========================================
pub fn order(code: &str, order_type: ProductionOrderType) -> ProductionOrder {
    raw_order(code, order_type.to_db_str())
}

/// 任意类型标签（含无法识别的标签）
pub fn raw_order(code: &str, order_type: &str) -> ProductionOrder {
    ProductionOrder {
        id: 0,
        production_order_code: code.to_string(),
        order_type: order_type.to_string(),
        description: None,
        status: ProductionStatus::Pending,
    }
}

pub fn output(order_id: i64, product_id: i64, name: &str, amount: f64) -> ProductionOutput {
    ProductionOutput {
        id: 0,
        production_order_id: order_id,
        product_id,
        product_name: Some(name.to_string()),
        uom: Some("tấm".to_string()),
        amount,
        finished: 0.0,
        defected: 0.0,
    }
}

// ==========================================
// SlipRequestBuilder
// ==========================================
pub struct SlipRequestBuilder {
    req: CreateSlipRequest,
}

impl SlipRequestBuilder {
    pub fn new(order_id: i64) -> Self {
        Self {
            req: CreateSlipRequest {
                production_order_id: order_id,
                description: None,
                lines: Vec::new(),
                mappings: Vec::new(),
                targets: Vec::new(),
            },
        }
    }

    pub fn description(mut self, d: &str) -> Self {
        self.req.description = Some(d.to_string());
        self
    }

    pub fn line(mut self, product_id: i64, quantity: f64) -> Self {
        self.req.lines.push(SlipLineRequest {
            product_id: Some(product_id),
            quantity,
            note: None,
            sort_order: None,
            production_output_id: None,
        });
        self
    }

    pub fn output_line(mut self, product_id: i64, quantity: f64, output_id: i64) -> Self {
        self.req.lines.push(SlipLineRequest {
            product_id: Some(product_id),
            quantity,
            note: None,
            sort_order: None,
            production_output_id: Some(output_id),
        });
        self
    }

    pub fn mapping(mut self, input_index: usize, output_index: usize) -> Self {
        self.req.mappings.push(MappingEdgeRequest {
            input_index,
            output_index,
        });
        self
    }

    pub fn target(mut self, output_id: i64, quantity: f64) -> Self {
        self.req.targets.push(ProductionTargetRequest {
            production_output_id: output_id,
            target_quantity: quantity,
        });
        self
    }

    pub fn build(self) -> CreateSlipRequest {
        self.req
    }
}
