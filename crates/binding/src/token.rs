//! ERC20/TRC20 token contract bindings.
//!
//! TRC20 shares the ERC20 ABI, so the same definitions encode calls for both
//! chain families.

use alloy_sol_types::sol;

sol! {
    /// Read-only subset of the ERC20 interface
    #[sol(rpc)]
    interface IERC20 {
        /// Get token balance of an account
        function balanceOf(address account) external view returns (uint256);

        /// Get token name
        function name() external view returns (string memory);

        /// Get token symbol
        function symbol() external view returns (string memory);

        /// Get token decimals
        function decimals() external view returns (uint8);
    }
}
