//! 配置校验模块
//!
//! 校验规则：
//! - batch_size / queue_capacity / wait_ms >= 1
//! - processor.name 非空
//! - file processor 必须提供 params.path

use contracts::{ContractError, DispatcherBlueprint, ProcessorType};

/// 校验 DispatcherBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &DispatcherBlueprint) -> Result<(), ContractError> {
    blueprint.batcher.check()?;
    validate_processor(blueprint)?;
    Ok(())
}

/// 校验 processor 配置
fn validate_processor(blueprint: &DispatcherBlueprint) -> Result<(), ContractError> {
    let processor = &blueprint.processor;

    if processor.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "processor.name",
            "processor name cannot be empty",
        ));
    }

    if processor.processor_type == ProcessorType::File {
        let has_path = processor
            .params
            .get("path")
            .is_some_and(|p| !p.trim().is_empty());
        if !has_path {
            return Err(ContractError::config_validation(
                "processor.params.path",
                "file processor requires a non-empty 'path'",
            ));
        }
    }

    Ok(())
}
