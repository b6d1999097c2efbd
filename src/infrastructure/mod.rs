pub mod cmc_client;
