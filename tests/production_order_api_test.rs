// ==========================================
// ProductionOrderApi 集成测试
// ==========================================

mod helpers;

use std::collections::HashSet;

use glass_slip_engine::api::ApiError;
use helpers::api_test_helper::SlipTestEnv;
use helpers::test_data_builder::{raw_order, ProductBuilder};

fn ids(products: &[glass_slip_engine::domain::Product]) -> HashSet<i64> {
    products.iter().map(|p| p.id).collect()
}

#[test]
fn test_get_production_order_info_切玻璃候选产品() {
    let env = SlipTestEnv::new().expect("无法创建测试环境");
    let fx = env.seed_cut_glass();
    let vn_raw = env
        .product_repo
        .create(
            &ProductBuilder::new("K-V", "Kính màu")
                .product_type("Nguyên vật liệu")
                .build(),
        )
        .unwrap();
    let kg_raw = env
        .product_repo
        .create(&ProductBuilder::new("K-KG", "Bột mài").uom("kg").build())
        .unwrap();

    let info = env
        .state
        .production_order_api
        .get_production_order_info(fx.order_id)
        .unwrap()
        .unwrap();

    assert_eq!(info.production_order_code, "LSX001");
    assert_eq!(info.planned_outputs.len(), 1);

    let raw = ids(&info.raw_materials);
    assert!(raw.contains(&fx.raw_a));
    assert!(raw.contains(&fx.offcut_c));
    assert!(raw.contains(&fx.raw_d));
    assert!(raw.contains(&vn_raw));
    assert!(!raw.contains(&kg_raw));
    assert!(!raw.contains(&fx.semi_b));

    assert_eq!(info.semi_finished.len(), 1);
    assert_eq!(info.semi_finished[0].id, fx.semi_b);
    assert_eq!(info.semi_finished[0].product_type.as_deref(), Some("Bán thành phẩm"));

    // 余料玻璃只取类型严格为 NVL 的片材
    let offcuts = ids(&info.glass_offcuts);
    assert!(offcuts.contains(&fx.offcut_c));
    assert!(!offcuts.contains(&vn_raw));

    let available = ids(&info.available_products);
    assert_eq!(available.len(), info.available_products.len());
    assert!(available.contains(&fx.semi_b));
    assert!(available.contains(&vn_raw));
}

#[test]
fn test_get_production_order_info_物料出库候选产品() {
    let env = SlipTestEnv::new().expect("无法创建测试环境");
    let fx = env.seed_material_export();
    let catalog_sheet = env
        .product_repo
        .create(&ProductBuilder::new("K-N", "Kính trắng 4mm").build())
        .unwrap();

    let info = env
        .state
        .production_order_api
        .get_production_order_info(fx.order_id)
        .unwrap()
        .unwrap();

    // 分组均为空，候选只在 available_products 中给出
    assert!(info.raw_materials.is_empty());
    assert!(info.semi_finished.is_empty());
    assert!(info.glass_offcuts.is_empty());

    let available = ids(&info.available_products);
    // BOM 中的片材 + 目录 NVL 片材；kg 物料不在内
    assert!(available.contains(&fx.glass_g));
    assert!(available.contains(&catalog_sheet));
    assert!(!available.contains(&fx.glue_h));
    assert_eq!(info.available_products[0].id, fx.glass_g);
}

#[test]
fn test_get_production_order_info_不存在与未知类型() {
    let env = SlipTestEnv::new().expect("无法创建测试环境");
    assert!(env
        .state
        .production_order_api
        .get_production_order_info(404)
        .unwrap()
        .is_none());

    let order_id = env
        .production_repo
        .create_order(&raw_order("LSX010", "Sơn kính"))
        .unwrap();
    let err = env
        .state
        .production_order_api
        .get_production_order_info(order_id)
        .unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_ORDER_TYPE");
    assert!(matches!(err, ApiError::UnsupportedOrderType { .. }));
}

#[test]
fn test_materials_by_output_附带产品信息() {
    let env = SlipTestEnv::new().expect("无法创建测试环境");
    let fx = env.seed_material_export();

    let materials = env
        .state
        .production_order_api
        .materials_by_output(fx.output_id)
        .unwrap();
    assert_eq!(materials.len(), 2);

    let glass = materials
        .iter()
        .find(|m| m.material.product_id == fx.glass_g)
        .unwrap();
    assert_eq!(glass.product_code.as_deref(), Some("K-G"));
    assert_eq!(glass.material.amount, 2.0);

    assert!(matches!(
        env.state.production_order_api.materials_by_output(999).unwrap_err(),
        ApiError::NotFound(_)
    ));
}
