use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::chain_adapters::SwapTransaction;

/// Mẫu số của slippage tính theo basis point
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Lệnh swap native -> token được cấu hình sẵn, không đổi suốt quá trình chạy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapIntent {
    pub router: Address,
    /// Lượng native token (wei) bỏ vào
    pub input_amount: U256,
    /// [wrapped native, token đích]
    pub token_path: Vec<Address>,
    /// Độ trượt giá chấp nhận được (basis point, 0..=10_000)
    pub slippage_bps: u32,
    pub deadline_offset_secs: u64,
    pub gas_limit: U256,
    pub gas_price: U256,
}

impl SwapIntent {
    /// quoted * (10_000 - slippage_bps) / 10_000, làm tròn xuống
    pub fn minimum_output(&self, quoted: U256) -> U256 {
        let keep = U256::from(BPS_DENOMINATOR.saturating_sub(self.slippage_bps.min(BPS_DENOMINATOR)));
        let denominator = U256::from(BPS_DENOMINATOR);
        match quoted.checked_mul(keep) {
            Some(product) => product / denominator,
            // Tránh tràn số với quote cực lớn
            None => quoted / denominator * keep,
        }
    }

    /// Deadline tuyệt đối (unix giây) tính từ `now`
    pub fn deadline(&self, now: u64) -> U256 {
        U256::from(now.saturating_add(self.deadline_offset_secs))
    }

    /// Chi phí tối đa của một lần gửi: value + gas_limit * gas_price
    pub fn max_cost(&self) -> U256 {
        self.gas_limit
            .saturating_mul(self.gas_price)
            .saturating_add(self.input_amount)
    }

    /// Ghép thành giao dịch hoàn chỉnh
    pub fn build_transaction(&self, recipient: Address, amount_out_min: U256, deadline: U256, nonce: U256) -> SwapTransaction {
        SwapTransaction {
            router: self.router,
            amount_out_min,
            path: self.token_path.clone(),
            recipient,
            deadline,
            value: self.input_amount,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            nonce,
        }
    }
}
