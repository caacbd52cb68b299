// ==========================================
// 完成量回写失败 集成测试
// ==========================================
// 红线: 回写是提交后的尽力而为步骤，失败不回滚单据
// ==========================================

mod helpers;

use std::sync::{Arc, Mutex};

use glass_slip_engine::api::ReconciliationOutcome;
use glass_slip_engine::engine::{CollaboratorResult, ProductionOrderService, ProductionOutputService};
use helpers::api_test_helper::SlipTestEnv;
use helpers::test_data_builder::SlipRequestBuilder;

/// 计划产出服务: 总是报错
struct FailingOutputService;

impl ProductionOutputService for FailingOutputService {
    fn update_finished_quantity(&self, output_id: i64, _amount: f64) -> CollaboratorResult<bool> {
        Err(format!("output service unavailable: {}", output_id).into())
    }
}

/// 生产指令服务: 记录完工检查调用
#[derive(Default)]
struct RecordingOrderService {
    checked: Mutex<Vec<i64>>,
}

impl ProductionOrderService for RecordingOrderService {
    fn check_and_update_completion(&self, order_id: i64) -> CollaboratorResult<bool> {
        self.checked.lock().unwrap().push(order_id);
        Ok(false)
    }
}

#[test]
fn test_create_slip_回写失败时单据仍提交() {
    let order_service = Arc::new(RecordingOrderService::default());
    let env = SlipTestEnv::with_services(Arc::new(FailingOutputService), order_service.clone())
        .expect("无法创建测试环境");
    let fx = env.seed_cut_glass();

    let req = SlipRequestBuilder::new(fx.order_id)
        .line(fx.raw_a, 2.0)
        .line(fx.semi_b, 8.0)
        .mapping(0, 1)
        .build();
    let created = env.state.slip_api.create_slip(&req, 1).unwrap();

    match &created.reconciliation {
        ReconciliationOutcome::Failed { message } => {
            assert!(message.contains("output service unavailable"));
        }
        other => panic!("回写应失败: {:?}", other),
    }

    // 单据、明细、映射边均已落库
    let slip = env.state.slip_api.get_slip(created.slip.id).unwrap().unwrap();
    assert_eq!(slip.details.len(), 2);
    assert_eq!(slip.mappings.len(), 1);
    assert_eq!(env.finished_of(fx.output_id), 0.0);

    // 首个累加失败即中止，不做完工检查
    assert!(order_service.checked.lock().unwrap().is_empty());
}

#[test]
fn test_create_slip_无贡献时仍做完工检查() {
    let order_service = Arc::new(RecordingOrderService::default());
    let env = SlipTestEnv::with_services(Arc::new(FailingOutputService), order_service.clone())
        .expect("无法创建测试环境");
    let fx = env.seed_cut_glass();

    let req = SlipRequestBuilder::new(fx.order_id).line(fx.raw_a, 2.0).build();
    let created = env.state.slip_api.create_slip(&req, 1).unwrap();

    assert!(created.reconciliation.is_applied());
    assert_eq!(*order_service.checked.lock().unwrap(), vec![fx.order_id]);
}
