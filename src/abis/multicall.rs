use alloy::sol;

sol! {
    /// One slot of an `aggregate3` batch.
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    /// Per-slot outcome: `success` is false when the inner call reverted.
    struct McResult {
        bool success;
        bytes returnData;
    }

    #[sol(rpc)]
    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (McResult[] memory returnData);
    }
}
