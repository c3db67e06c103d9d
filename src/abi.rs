use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface Raffle {
        event WinnerPicked(address indexed winner);

        function enterRaffle() external payable;
        function getEntranceFee() external view returns (uint256);
        function getNumberOfPlayers() external view returns (uint256);
        function getRecentWinner() external view returns (address);
    }
}
