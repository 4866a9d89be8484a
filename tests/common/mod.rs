pub mod mock_cluster;
