pub mod portal_service;
